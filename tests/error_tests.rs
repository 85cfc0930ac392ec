// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::Value;
use trainquest::error::{AppError, ErrorKind};

async fn render(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_validation_errors_are_bad_requests_with_details() {
    let (status, body) = render(AppError::InvalidAddress("0x12".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_address");
    assert!(body["details"].as_str().unwrap().contains("0x12"));

    let (status, body) = render(AppError::MissingField("Wallet address")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "Wallet address is required");
}

#[tokio::test]
async fn test_trade_rule_violations_are_bad_requests() {
    for err in [
        AppError::SelfTradeNotAllowed,
        AppError::CardNotOwned("delhi-master".to_string()),
        AppError::RecipientNotRegistered("0xabc".to_string()),
        AppError::RecipientHasNoProgress("0xabc".to_string()),
        AppError::InvalidSenderSession("1".to_string()),
    ] {
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let code = err.code();
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{code}");
        assert_eq!(body["error"], code);
    }
}

#[tokio::test]
async fn test_version_conflict_is_409() {
    let (status, body) = render(AppError::VersionConflict {
        expected: 3,
        actual: 5,
    })
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "version_conflict");
    assert_eq!(
        body["details"],
        "Progress version conflict: expected 3, stored 5"
    );
}

#[tokio::test]
async fn test_session_not_found_is_404() {
    let (status, body) = render(AppError::SessionNotFound("42".to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "session_not_found");
}

#[tokio::test]
async fn test_server_side_failures_hide_details() {
    let (status, body) = render(AppError::Persistence(
        "rename /var/lib/trainquest/wallet_data.json.tmp: permission denied".to_string(),
    ))
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "persistence_error");
    assert!(body.get("details").is_none());

    let (status, body) = render(AppError::Internal(anyhow::anyhow!("boom"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert!(body.get("details").is_none());
}
