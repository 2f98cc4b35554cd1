// src/middleware/auth.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState};

// Extrator para obter o usuário autenticado diretamente nos handlers.
// Toda movimentação e anulação fica assinada com este ID.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // A. Lê o cabeçalho "Authorization: Bearer <token>"
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::InvalidToken)?;

        // B. Valida o token com o segredo da aplicação
        let app_state = AppState::from_ref(state);
        let user_id = app_state.auth_service.validate_token(bearer.token())?;

        Ok(AuthenticatedUser(user_id))
    }
}
