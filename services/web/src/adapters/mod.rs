pub mod gotrue;
pub mod memory;
pub mod pkce;

pub use gotrue::GoTrueAdapter;
pub use memory::MemoryIdentityProvider;
