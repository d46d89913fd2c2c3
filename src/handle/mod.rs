//! Strong and weak handles to shared resources.

mod strong;
mod upcast;
mod weak;

pub use self::strong::Strong;
pub use self::upcast::Upcast;
pub use self::weak::Weak;
