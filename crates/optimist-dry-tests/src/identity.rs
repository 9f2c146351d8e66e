// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Token source with a fixed identity.

use optimist_client::TokenSource;
use optimist_proto::AccessToken;

/// Always returns the same token, or none when signed out.
#[derive(Clone, Debug, Default)]
pub struct StaticToken(Option<AccessToken>);

impl StaticToken {
    /// Signed in with `secret`.
    pub fn signed_in(secret: &str) -> Self {
        Self(Some(AccessToken::new(secret)))
    }

    /// Signed out.
    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl TokenSource for StaticToken {
    fn access_token(&mut self) -> Option<AccessToken> {
        self.0.clone()
    }
}
