//! Unit tests for the Magento SDK
//!
//! This module contains tests for various components of the SDK.

mod support;

pub mod client_tests;
