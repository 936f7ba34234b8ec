pub mod desktop;

pub use desktop::{DesktopActor, DesktopActorMsg, DesktopArguments};
