pub mod args;
pub mod op;
pub mod ops;
pub mod prompt;
pub mod render;

pub use ops::{
    Ci, Diff, History, Init, Login, Logout, Member, Project, Pull, Push, Register, Rollback,
    ServiceRole, Version, Whoami,
};
