//! Unit tests for error.rs
//!
//! Tests all Error variants, fatality classification and the pool retry helper.

use crate::error::{retry_with_fresh_pool, Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("vkQueueSubmit failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("vkQueueSubmit failed"));
}

#[test]
fn test_out_of_memory_display() {
    let err = Error::OutOfMemory;
    assert_eq!(format!("{}", err), "Out of GPU memory");
}

#[test]
fn test_configuration_error_display() {
    let err = Error::ConfigurationError("no surface formats".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Configuration error"));
    assert!(display.contains("no surface formats"));
}

#[test]
fn test_device_lost_display() {
    let err = Error::DeviceLost("fence wait timed out".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Device lost"));
    assert!(display.contains("fence wait timed out"));
}

#[test]
fn test_pool_exhausted_display() {
    let err = Error::PoolExhausted("descriptor pool".to_string());
    assert_eq!(format!("{}", err), "Pool exhausted: descriptor pool");
}

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

// ============================================================================
// FATALITY
// ============================================================================

#[test]
fn test_only_pool_exhaustion_is_recoverable() {
    assert!(!Error::PoolExhausted("x".to_string()).is_fatal());

    assert!(Error::BackendError("x".to_string()).is_fatal());
    assert!(Error::OutOfMemory.is_fatal());
    assert!(Error::InvalidResource("x".to_string()).is_fatal());
    assert!(Error::InitializationFailed("x".to_string()).is_fatal());
    assert!(Error::ConfigurationError("x".to_string()).is_fatal());
    assert!(Error::DeviceLost("x".to_string()).is_fatal());
}

// ============================================================================
// RETRY WITH FRESH POOL
// ============================================================================

struct FakePools {
    pools: Vec<u32>,
    attempts: u32,
}

impl FakePools {
    fn allocate(&mut self) -> Result<u32> {
        self.attempts += 1;
        match self.pools.last_mut() {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Ok(self.pools.len() as u32)
            }
            _ => Err(Error::PoolExhausted("fake".to_string())),
        }
    }
}

#[test]
fn test_retry_succeeds_without_growing() {
    let mut state = FakePools { pools: vec![2], attempts: 0 };
    let result = retry_with_fresh_pool(
        &mut state,
        |s| s.allocate(),
        |_| panic!("grow must not be called"),
    );
    assert_eq!(result, Ok(1));
    assert_eq!(state.attempts, 1);
}

#[test]
fn test_retry_grows_once_on_exhaustion() {
    let mut state = FakePools { pools: vec![0], attempts: 0 };
    let result = retry_with_fresh_pool(
        &mut state,
        |s| s.allocate(),
        |s| {
            s.pools.push(4);
            Ok(())
        },
    );
    assert_eq!(result, Ok(2));
    assert_eq!(state.attempts, 2);
    assert_eq!(state.pools, vec![0, 3]);
}

#[test]
fn test_retry_escalates_second_exhaustion() {
    let mut state = FakePools { pools: vec![0], attempts: 0 };
    let result = retry_with_fresh_pool(
        &mut state,
        |s| s.allocate(),
        |s| {
            s.pools.push(0);
            Ok(())
        },
    );
    match result {
        Err(err @ Error::BackendError(_)) => assert!(err.is_fatal()),
        other => panic!("expected fatal backend error, got {:?}", other),
    }
    assert_eq!(state.attempts, 2);
}

#[test]
fn test_retry_propagates_other_errors_without_growing() {
    let mut state = FakePools { pools: vec![], attempts: 0 };
    let result: Result<u32> = retry_with_fresh_pool(
        &mut state,
        |_| Err(Error::DeviceLost("gone".to_string())),
        |_| panic!("grow must not be called"),
    );
    assert_eq!(result, Err(Error::DeviceLost("gone".to_string())));
}

#[test]
fn test_retry_propagates_grow_failure() {
    let mut state = FakePools { pools: vec![0], attempts: 0 };
    let result = retry_with_fresh_pool(
        &mut state,
        |s| s.allocate(),
        |_| Err(Error::OutOfMemory),
    );
    assert_eq!(result, Err(Error::OutOfMemory));
    assert_eq!(state.attempts, 1);
}
