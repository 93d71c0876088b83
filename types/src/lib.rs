#![allow(non_camel_case_types)]

pub use num_complex;

pub type c64 = num_complex::Complex<f64>;

/// Where the inner kernels of an operation run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProcessingUnit {
    Cpu,
    Gpu,
}

impl Default for ProcessingUnit {
    fn default() -> Self {
        ProcessingUnit::Cpu
    }
}

impl std::str::FromStr for ProcessingUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Ok(ProcessingUnit::Cpu),
            "gpu" => Ok(ProcessingUnit::Gpu),
            other => Err(format!("unknown processing unit '{}'", other)),
        }
    }
}

impl std::fmt::Display for ProcessingUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ProcessingUnit::Cpu => write!(f, "cpu"),
            ProcessingUnit::Gpu => write!(f, "gpu"),
        }
    }
}
