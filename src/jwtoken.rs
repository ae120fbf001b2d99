use chrono::{Days, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use serde::{Deserialize, Serialize};

/// Identity claims the engine trusts: a stable user id plus a display name.
/// Everything beyond issuing and checking these tokens is the identity
/// service's problem, not ours.
#[derive(Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub name: String,
    pub exp: usize,
}

pub fn generate_token(user_id: &str, name: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = Utc::now()
        .checked_add_days(Days::new(1))
        .map(|at| at.timestamp())
        .unwrap_or(0);

    let new_claims = Claims {
        id: user_id.to_string(),
        name: name.to_string(),
        exp: expiration as usize,
    };
    encode(
        &Header::default(),
        &new_claims,
        &EncodingKey::from_secret("secret".as_ref()),
    )
}

pub fn decode_token(token: &str) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret("secret".as_ref()),
        &Validation::new(Algorithm::HS256),
    )
}
