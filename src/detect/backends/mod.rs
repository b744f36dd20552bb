pub mod cpu;
pub mod fixed;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use cpu::CpuBackend;
pub use fixed::FixedBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
