pub mod audio;
pub mod frame;
pub mod mixer;
pub mod tap;

#[cfg(feature = "device")]
pub mod device;
