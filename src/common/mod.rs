pub mod frame;
pub mod orientation;
pub mod ticker;

pub use frame::Frame;
pub use orientation::{CameraPosition, DeviceOrientation, ImageOrientation};
pub use ticker::{LogThrottle, Ticker};
