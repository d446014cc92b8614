mod access;
mod launch;
mod signer;

pub use access::AccessTokenRegistry;
pub use launch::{AppLaunchTokenService, LAUNCH_TOKEN_TTL};
pub use signer::{Claims, Hs256Signer, TokenSigner, VerifyError};
