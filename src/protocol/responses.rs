//! Control replies and data sentinels
//!
//! Every reply is a short bare token with no terminator.

/// Reply tokens written on the control connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    NoError,
    CommandOk,
    CommandError,
    FileFound,
    FileError,
}

impl Reply {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reply::NoError => "NE",
            Reply::CommandOk => "NCE",
            Reply::CommandError => "CE",
            Reply::FileFound => "NFE",
            Reply::FileError => "FE",
        }
    }

    pub fn as_bytes(&self) -> &'static [u8] {
        self.as_str().as_bytes()
    }

    pub fn from_token(token: &str) -> Option<Reply> {
        match token {
            "NE" => Some(Reply::NoError),
            "NCE" => Some(Reply::CommandOk),
            "CE" => Some(Reply::CommandError),
            "NFE" => Some(Reply::FileFound),
            "FE" => Some(Reply::FileError),
            _ => None,
        }
    }
}

/// End-of-payload markers written on the data connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    EndOfDirectory,
    EndOfFile,
}

impl Sentinel {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Sentinel::EndOfDirectory => b"EOD",
            Sentinel::EndOfFile => b"EOF",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_tokens_match_wire_values() {
        assert_eq!(Reply::NoError.as_str(), "NE");
        assert_eq!(Reply::CommandOk.as_str(), "NCE");
        assert_eq!(Reply::CommandError.as_str(), "CE");
        assert_eq!(Reply::FileFound.as_str(), "NFE");
        assert_eq!(Reply::FileError.as_str(), "FE");
        assert_eq!(Reply::from_token("NFE"), Some(Reply::FileFound));
        assert_eq!(Reply::from_token("OK"), None);
    }
}
