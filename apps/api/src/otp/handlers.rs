use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::AppError;
use crate::otp::OtpError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct SendCodeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// POST /api/sms
pub async fn handle_send_code(
    State(state): State<AppState>,
    Json(request): Json<SendCodeRequest>,
) -> Result<Json<SendCodeResponse>, AppError> {
    match state.otp.send(&request.phone).await {
        Ok(code) => Ok(Json(SendCodeResponse {
            success: true,
            code,
            message: None,
        })),
        Err(OtpError::InvalidPhone(phone)) => {
            Err(AppError::Validation(format!("Invalid phone number: {phone}")))
        }
        Err(e) => {
            warn!("Failed to issue verification code: {e}");
            Ok(Json(SendCodeResponse {
                success: false,
                code: None,
                message: Some("验证码发送失败，请稍后重试".to_string()),
            }))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyCodeResponse {
    pub success: bool,
}

/// POST /api/verify
pub async fn handle_verify_code(
    State(state): State<AppState>,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>, AppError> {
    match state.otp.verify(&request.phone, &request.code).await {
        Ok(success) => Ok(Json(VerifyCodeResponse { success })),
        Err(OtpError::InvalidPhone(phone)) => {
            Err(AppError::Validation(format!("Invalid phone number: {phone}")))
        }
        Err(e) => {
            warn!("Failed to verify code: {e}");
            Ok(Json(VerifyCodeResponse { success: false }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::test_support::{test_state, ScriptedCompleter};

    #[tokio::test]
    async fn test_send_then_verify() {
        let state = test_state(Arc::new(ScriptedCompleter::unavailable()));
        let Json(sent) = handle_send_code(
            State(state.clone()),
            Json(SendCodeRequest {
                phone: "13800138000".into(),
            }),
        )
        .await
        .unwrap();
        assert!(sent.success);
        let code = sent.code.unwrap();

        let Json(verified) = handle_verify_code(
            State(state),
            Json(VerifyCodeRequest {
                phone: "13800138000".into(),
                code,
            }),
        )
        .await
        .unwrap();
        assert!(verified.success);
    }

    #[tokio::test]
    async fn test_invalid_phone_is_a_validation_error() {
        let state = test_state(Arc::new(ScriptedCompleter::unavailable()));
        let result = handle_send_code(
            State(state),
            Json(SendCodeRequest {
                phone: "555-0100".into(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
