// Unit tests for processing parameters and the error latch
//
// These tests verify whole-snapshot parameter updates, rejection of invalid
// values without mutation, and last-error overwrite semantics.

use denoise_rt::session::{DenoiseParams, ErrorLatch, ParameterStore};
use denoise_rt::SessionState;

#[test]
fn test_params_default_values() {
    let params = DenoiseParams::default();

    assert_eq!(params.post_filter_beta, 0.02);
    assert_eq!(params.atten_lim_db, 100.0);
    assert!(params.validate().is_ok());
}

#[test]
fn test_params_reject_negative_values() {
    assert!(DenoiseParams::new(-0.1, 100.0).is_err());
    assert!(DenoiseParams::new(0.5, -1.0).is_err());
    assert!(DenoiseParams::new(0.5, 30.0).is_ok());
}

#[test]
fn test_params_reject_non_finite_values() {
    assert!(DenoiseParams::new(f32::NAN, 100.0).is_err());
    assert!(DenoiseParams::new(0.5, f32::INFINITY).is_err());
}

#[test]
fn test_store_set_replaces_whole_snapshot() {
    let store = ParameterStore::default();

    let next = DenoiseParams {
        post_filter_beta: 0.5,
        atten_lim_db: 30.0,
    };
    store.set(next).expect("valid params should be accepted");

    assert_eq!(store.snapshot(), next);
}

#[test]
fn test_store_rejects_invalid_set_without_mutation() {
    let store = ParameterStore::new(DenoiseParams {
        post_filter_beta: 0.5,
        atten_lim_db: 30.0,
    });
    let before = store.snapshot();

    let invalid = DenoiseParams {
        post_filter_beta: -1.0,
        atten_lim_db: 30.0,
    };
    assert!(store.set(invalid).is_err());
    assert_eq!(store.snapshot(), before, "rejected update must not mutate");
}

#[test]
fn test_store_field_setters_keep_other_field() {
    let store = ParameterStore::new(DenoiseParams {
        post_filter_beta: 0.5,
        atten_lim_db: 30.0,
    });

    store
        .set_post_filter_beta(0.9)
        .expect("valid beta should be accepted");
    assert_eq!(store.snapshot().post_filter_beta, 0.9);
    assert_eq!(store.snapshot().atten_lim_db, 30.0);

    assert!(store.set_atten_lim_db(-5.0).is_err());
    assert_eq!(store.snapshot().atten_lim_db, 30.0);
}

#[test]
fn test_error_latch_overwrites_previous_message() {
    let latch = ErrorLatch::new();
    assert_eq!(latch.last(), "");

    latch.record("first failure");
    assert_eq!(latch.last(), "first failure");

    latch.record("second failure");
    assert_eq!(latch.last(), "second failure");

    latch.clear();
    assert_eq!(latch.last(), "");
}

#[test]
fn test_session_state_predicates() {
    assert!(!SessionState::Uninitialized.is_operable());
    assert!(SessionState::Initialized.is_operable());
    assert!(SessionState::Processing.is_operable());
    assert!(SessionState::Stopped.is_operable());
    assert!(!SessionState::Released.is_operable());

    assert!(SessionState::Initialized.can_start());
    assert!(SessionState::Stopped.can_start());
    assert!(!SessionState::Processing.can_start());
    assert!(!SessionState::Uninitialized.can_start());
    assert!(!SessionState::Released.can_start());
}
