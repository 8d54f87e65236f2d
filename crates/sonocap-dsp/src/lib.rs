pub mod codec;
pub mod energy;
pub mod signal;

pub use codec::decode;
pub use energy::EnergyDetector;
pub use signal::Signal;
