//! Shared constants for end-to-end tests
//!
//! When test data changes (user credentials, stub video ids, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Pre-registered test user
pub const TEST_USER: &str = "testuser";

/// Pre-registered test user password
pub const TEST_PASS: &str = "testpass123";

/// Pre-registered test user email
pub const TEST_EMAIL: &str = "testuser@example.com";

// ============================================================================
// Stub Catalog Videos
// ============================================================================
// Video ids must look like real ones (11 URL-safe base64 chars), the audio
// route validates the shape.

pub const VIDEO_1_ID: &str = "vid00000001";
pub const VIDEO_2_ID: &str = "vid00000002";
pub const VIDEO_3_ID: &str = "vid00000003";

pub const VIDEO_1_TITLE: &str = "Never Gonna Give You Up";
pub const VIDEO_2_TITLE: &str = "Second Song";
pub const VIDEO_3_TITLE: &str = "Third Song";

// ============================================================================
// Timeouts
// ============================================================================

/// Per-request timeout for the test HTTP client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// How long to wait for a spawned server to answer its first request
pub const SERVER_READY_TIMEOUT_MS: u64 = 5_000;

/// Poll interval while waiting for server readiness
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;
