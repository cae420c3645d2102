use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, Validation, decode};

/// Decodes and validates an access token. Refresh tokens are refused.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())?;

    if claims.token_type != TokenType::Access {
        return Err("Refresh token cannot be used for API access".to_string());
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token_for(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(token_type: TokenType) -> Claims {
        Claims {
            user_id: 7,
            sub: "jdoe".into(),
            role: 3,
            exp: 4_102_444_800, // 2100-01-01
            jti: "test".into(),
            token_type,
            department: Some("logistics".into()),
        }
    }

    #[test]
    fn accepts_access_tokens() {
        let token = token_for(&claims(TokenType::Access), "s3cret");
        let decoded = verify_token(&token, "s3cret").unwrap();
        assert_eq!(decoded.user_id, 7);
        assert_eq!(decoded.department.as_deref(), Some("logistics"));
    }

    #[test]
    fn rejects_refresh_tokens_and_wrong_secret() {
        let refresh = token_for(&claims(TokenType::Refresh), "s3cret");
        assert!(verify_token(&refresh, "s3cret").is_err());

        let access = token_for(&claims(TokenType::Access), "s3cret");
        assert!(verify_token(&access, "other").is_err());
    }
}
