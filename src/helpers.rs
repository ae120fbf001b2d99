use chrono::{DateTime, NaiveDateTime, Utc};
use tungstenite::Message;

use crate::models::communication::ClientMessage;

pub fn parse_message(msg: &Message) -> Result<ClientMessage, serde_json::Error> {
    serde_json::from_str(&msg.to_string())
}

pub fn utc_to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Corrupt out-of-range values fall back to the epoch rather than panicking.
pub fn millis_to_utc(millis: i64) -> DateTime<Utc> {
    let naive = NaiveDateTime::from_timestamp_millis(millis)
        .unwrap_or_else(|| NaiveDateTime::from_timestamp_millis(0).expect("epoch timestamp"));
    DateTime::<Utc>::from_utc(naive, Utc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_roundtrip() {
        let now = Utc::now();
        let restored = millis_to_utc(utc_to_millis(now));
        assert_eq!(restored.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn authorized_and_unauthorized_messages_parse() {
        let register = Message::Text(r#"{"register":{"name":"Alice"}}"#.to_string());
        assert!(matches!(
            parse_message(&register),
            Ok(ClientMessage::UnauthorizedCommand(_))
        ));

        let connect = Message::Text(r#"{"connect":{},"token":"abc"}"#.to_string());
        assert!(matches!(
            parse_message(&connect),
            Ok(ClientMessage::CommandTokenPair(_))
        ));

        let garbage = Message::Text("not json".to_string());
        assert!(parse_message(&garbage).is_err());
    }
}
