//! Device placement and weight dtype selection.

use crate::error::{Error, Result};
use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::{DType, Device};
use tracing::info;

/// Pick the accelerator when one was compiled in and is present, the CPU
/// otherwise.
pub fn select_device(force_cpu: bool) -> Result<Device> {
    if force_cpu {
        return Ok(Device::Cpu);
    }
    if cuda_is_available() {
        info!("placing model on CUDA device 0");
        Ok(Device::new_cuda(0)?)
    } else if metal_is_available() {
        info!("placing model on Metal device 0");
        Ok(Device::new_metal(0)?)
    } else {
        info!("no accelerator available, running on CPU");
        Ok(Device::Cpu)
    }
}

/// Parse a dtype name from the settings.
pub fn parse_dtype(name: &str) -> Result<DType> {
    match name {
        "f16" => Ok(DType::F16),
        "bf16" => Ok(DType::BF16),
        "f32" => Ok(DType::F32),
        other => Err(Error::InvalidConfig(format!("unsupported dtype {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dtype() {
        assert_eq!(parse_dtype("f16").unwrap(), DType::F16);
        assert_eq!(parse_dtype("bf16").unwrap(), DType::BF16);
        assert_eq!(parse_dtype("f32").unwrap(), DType::F32);
        assert!(parse_dtype("q4").is_err());
    }

    #[test]
    fn test_forced_cpu() {
        let device = select_device(true).unwrap();
        assert!(device.is_cpu());
    }
}
