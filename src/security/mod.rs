pub mod cipher;
pub mod password;
pub mod roles;
pub mod token;

pub use cipher::FieldCipher;
pub use password::PasswordHasher;
pub use roles::{ADMIN_ROLES, Role, SUPERADMIN_ONLY};
pub use token::{Identity, TokenService};
