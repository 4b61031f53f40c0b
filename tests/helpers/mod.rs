// ABOUTME: Test helper modules shared by integration tests
// ABOUTME: Request builder lives in axum_test
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

pub mod axum_test;
