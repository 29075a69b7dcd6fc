use std::time::Duration;

use regen_primitives::Rope;

use super::*;
use crate::test_support::{TEST_TIMEOUT, TestGenerator, as_dyn, doc};

async fn within<F: std::future::Future>(fut: F) -> F::Output {
	tokio::time::timeout(TEST_TIMEOUT, fut).await.expect("test step timed out")
}

#[tokio::test]
async fn computes_once_then_hits() {
	let generator = TestGenerator::new();
	let g = as_dyn(&generator);
	let d = doc("/app/A.page", "<p>a</p>");

	let first = within(d.generated_output(&g)).await.unwrap();
	let second = within(d.generated_output(&g)).await.unwrap();

	assert_eq!(generator.calls(), 1);
	assert_eq!(first.version(), d.version());
	assert!(Arc::ptr_eq(first.artifact(), second.artifact()));
	assert_eq!(first.artifact().code(), "// /app/A.page\n<p>a</p>");
	assert_eq!(first.source().to_string(), "<p>a</p>");
	assert_eq!(d.output().output_version(), Some(d.version()));
}

#[tokio::test]
async fn concurrent_requests_for_same_version_share_one_computation() {
	let generator = TestGenerator::new();
	let g = as_dyn(&generator);
	let d = doc("/app/A.page", "shared");
	let gate = generator.gate("shared");

	let a = tokio::spawn({
		let (d, g) = (d.clone(), Arc::clone(&g));
		async move { d.generated_output(&g).await }
	});
	within(gate.entered()).await;
	assert!(d.output().is_computing());

	let b = tokio::spawn({
		let (d, g) = (d.clone(), Arc::clone(&g));
		async move { d.generated_output(&g).await }
	});
	tokio::time::sleep(Duration::from_millis(20)).await;
	gate.open();

	let a = within(a).await.unwrap().unwrap();
	let b = within(b).await.unwrap().unwrap();
	assert_eq!(generator.calls(), 1);
	assert!(Arc::ptr_eq(a.artifact(), b.artifact()));
	assert!(!d.output().is_computing());
}

#[tokio::test]
async fn older_result_finishing_last_does_not_overwrite_newer() {
	let generator = TestGenerator::new();
	let g = as_dyn(&generator);
	let v1 = doc("/app/A.page", "one");
	let v2 = v1.with_text(Rope::from("two"));
	let gate = generator.gate("one");

	let slow = tokio::spawn({
		let (d, g) = (v1.clone(), Arc::clone(&g));
		async move { d.generated_output(&g).await }
	});
	within(gate.entered()).await;

	let fresh = within(v2.generated_output(&g)).await.unwrap();
	assert_eq!(fresh.version(), v2.version());

	gate.open();
	let late = within(slow).await.unwrap().unwrap();

	assert_eq!(late.version(), v2.version());
	assert_eq!(late.source().to_string(), "two");
	let installed = v1.output().try_get_cached().unwrap();
	assert_eq!(installed.version(), v2.version());
	assert_eq!(v1.output().output_version(), Some(v2.version()));
	assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn older_handle_is_served_by_newer_installed_output() {
	let generator = TestGenerator::new();
	let g = as_dyn(&generator);
	let v1 = doc("/app/A.page", "one");
	let v2 = v1.with_text(Rope::from("two"));

	within(v2.generated_output(&g)).await.unwrap();
	let served = within(v1.generated_output(&g)).await.unwrap();

	assert_eq!(served.version(), v2.version());
	assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn clear_keeps_output_version() {
	let generator = TestGenerator::new();
	let g = as_dyn(&generator);
	let d = doc("/app/A.page", "x");

	within(d.generated_output(&g)).await.unwrap();
	let version = d.output().output_version();
	assert!(version.is_some());

	d.output().clear();
	d.output().clear();
	assert!(d.output().try_get_cached().is_none());
	assert_eq!(d.output().output_version(), version);

	let again = within(d.generated_output(&g)).await.unwrap();
	assert_eq!(generator.calls(), 2);
	assert_eq!(again.version(), d.version());
	assert_eq!(d.output().output_version(), version);
}

#[tokio::test]
async fn output_version_is_absent_before_first_install() {
	let generator = TestGenerator::new();
	generator.fail_on("/app/Bad.page");
	let g = as_dyn(&generator);
	let d = doc("/app/Bad.page", "oops");

	assert_eq!(d.output().output_version(), None);
	let err = within(d.generated_output(&g)).await.unwrap_err();
	assert!(matches!(err, GenerationError::Failed { ref message, .. } if message == "syntax error"));
	assert_eq!(d.output().output_version(), None);
	assert!(!d.output().is_computing());
}

#[tokio::test]
async fn generator_panic_is_reported() {
	let generator = TestGenerator::new();
	generator.panic_on("/app/Boom.page");
	let g = as_dyn(&generator);
	let d = doc("/app/Boom.page", "boom");

	let err = within(d.generated_output(&g)).await.unwrap_err();
	match err {
		GenerationError::Panicked { path, message } => {
			assert_eq!(path, std::path::PathBuf::from("/app/Boom.page"));
			assert!(message.contains("exploded"), "unexpected panic message: {message}");
		}
		other => panic!("expected panic error, got {other:?}"),
	}
	assert!(d.output().try_get_cached().is_none());
}

#[tokio::test]
async fn computation_installs_after_caller_goes_away() {
	let generator = TestGenerator::new();
	let g = as_dyn(&generator);
	let d = doc("/app/A.page", "detached");
	let gate = generator.gate("detached");

	let caller = tokio::spawn({
		let (d, g) = (d.clone(), Arc::clone(&g));
		async move { d.generated_output(&g).await }
	});
	within(gate.entered()).await;
	caller.abort();
	gate.open();

	within(async {
		while d.output().try_get_cached().is_none() {
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
	})
	.await;
	assert_eq!(d.output().output_version(), Some(d.version()));
	assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn clear_during_inflight_computation_keeps_output_version() {
	let generator = TestGenerator::new();
	let g = as_dyn(&generator);
	let v1 = doc("/app/A.page", "one");
	let v2 = v1.with_text(Rope::from("two"));
	let gate = generator.gate("one");

	let slow = tokio::spawn({
		let (d, g) = (v1.clone(), Arc::clone(&g));
		async move { d.generated_output(&g).await }
	});
	within(gate.entered()).await;
	within(v2.generated_output(&g)).await.unwrap();

	// The superseded computation is still running after the newer one finished.
	assert!(v1.output().is_computing());

	v1.output().clear();
	assert!(v1.output().try_get_cached().is_none());
	assert_eq!(v1.output().output_version(), Some(v2.version()));

	gate.open();
	let late = within(slow).await.unwrap().unwrap();

	// Nothing was installed when the older result landed, so it is the freshest present.
	assert_eq!(late.version(), v1.version());
	assert_eq!(v1.output().try_get_cached().map(|c| c.version()), Some(v1.version()));
	assert_eq!(v1.output().output_version(), Some(v2.version()));
	assert!(!v1.output().is_computing());
}
