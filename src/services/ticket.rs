use rand::{rngs::OsRng, RngCore};

/// Random bytes behind each ticket token.
pub const TOKEN_BYTES: usize = 16;

/// Admission credential printed as the ticket's QR payload. Drawn from the
/// operating system CSPRNG; never derived from ids or timestamps.
#[derive(Clone, PartialEq, Eq)]
pub struct TicketToken(String);

impl TicketToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        TicketToken(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

// Токен не должен попадать в логи
impl std::fmt::Debug for TicketToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TicketToken(..)")
    }
}
