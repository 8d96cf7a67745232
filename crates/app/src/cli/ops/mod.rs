pub mod auth;
pub mod ci;
pub mod env;
pub mod init;
pub mod member;
pub mod project;
pub mod service_role;
pub mod version;

pub use auth::{Login, Logout, Register, Whoami};
pub use ci::Ci;
pub use env::{Diff, History, Pull, Push, Rollback};
pub use init::Init;
pub use member::Member;
pub use project::Project;
pub use service_role::ServiceRole;
pub use version::Version;
