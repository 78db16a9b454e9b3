//! WeChat official-account template messages: authentication, template
//! introspection and sending.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    config::Credentials,
    error::{LoveNoteError, Result},
    http,
    model::{OutgoingPayload, ProviderResponse},
};

const PROVIDER: &str = "wechat";
const API_BASE: &str = "https://api.weixin.qq.com";

static FIELD_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\.DATA\s*\}\}").expect("field marker pattern is valid")
});

/// Short-lived bearer token. Never logged.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// One entry from the account's private template list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TemplateInfo {
    pub template_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TemplateListResponse {
    errcode: Option<i64>,
    template_list: Option<Vec<TemplateInfo>>,
}

/// Field keys embedded in template `content` as `{{key.DATA}}`, in first-seen
/// order with duplicates removed.
pub fn extract_field_keys(content: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for cap in FIELD_MARKER.captures_iter(content) {
        let key = &cap[1];
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

#[derive(Debug, Clone)]
pub struct WeChatClient {
    app_id: String,
    app_secret: String,
    base: String,
    http: Client,
}

impl WeChatClient {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Result<Self> {
        Ok(Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            base: API_BASE.to_string(),
            http: http::client()?,
        })
    }

    pub fn from_credentials(credentials: &Credentials) -> Result<Self> {
        Self::new(&credentials.app_id, &credentials.app_secret)
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Client-credential exchange. Tokens are not cached between calls.
    pub async fn access_token(&self) -> Result<AccessToken> {
        let url = format!("{}/cgi-bin/token", self.base);

        let res = self
            .http
            .get(url)
            .query(&[
                ("grant_type", "client_credential"),
                ("appid", self.app_id.as_str()),
                ("secret", self.app_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| LoveNoteError::transport(PROVIDER, e))?;

        let (parsed, raw): (TokenResponse, _) = http::read_json(PROVIDER, res).await?;

        match parsed.access_token {
            Some(token) if !token.is_empty() => Ok(AccessToken(token)),
            _ => Err(LoveNoteError::protocol(PROVIDER, &raw)),
        }
    }

    pub async fn list_templates(&self, token: &AccessToken) -> Result<Vec<TemplateInfo>> {
        let url = format!("{}/cgi-bin/template/get_all_private_template", self.base);

        let res = self
            .http
            .get(url)
            .query(&[("access_token", token.as_str())])
            .send()
            .await
            .map_err(|e| LoveNoteError::transport(PROVIDER, e))?;

        let (parsed, raw): (TemplateListResponse, _) = http::read_json(PROVIDER, res).await?;

        if parsed.errcode.is_some_and(|code| code != 0) {
            return Err(LoveNoteError::protocol(PROVIDER, &raw));
        }

        parsed
            .template_list
            .ok_or_else(|| LoveNoteError::protocol(PROVIDER, &raw))
    }

    /// Ordered field keys declared by `template_id`.
    pub async fn fetch_field_order(
        &self,
        token: &AccessToken,
        template_id: &str,
    ) -> Result<Vec<String>> {
        let templates = self.list_templates(token).await?;

        let template = templates
            .iter()
            .find(|t| t.template_id == template_id)
            .ok_or_else(|| LoveNoteError::TemplateNotFound(template_id.to_string()))?;

        let keys = extract_field_keys(&template.content);
        if keys.is_empty() {
            return Err(LoveNoteError::NoTemplateFields(template_id.to_string()));
        }

        debug!(template = %template.title, fields = ?keys, "resolved template fields");
        Ok(keys)
    }

    /// Posts `payload` using an already acquired token.
    pub async fn send_with_token(
        &self,
        token: &AccessToken,
        payload: &OutgoingPayload,
    ) -> Result<ProviderResponse> {
        let url = format!("{}/cgi-bin/message/template/send", self.base);

        let res = self
            .http
            .post(url)
            .query(&[("access_token", token.as_str())])
            .json(payload)
            .send()
            .await
            .map_err(|e| LoveNoteError::transport(PROVIDER, e))?;

        let (parsed, raw): (ProviderResponse, _) = http::read_json(PROVIDER, res).await?;
        debug!(response = %raw, "send response");

        if !parsed.is_success() {
            return Err(LoveNoteError::protocol(PROVIDER, &raw));
        }

        info!(msgid = ?parsed.msgid, "template message accepted");
        Ok(parsed)
    }

    /// Authenticates, then posts `payload`.
    pub async fn send(&self, payload: &OutgoingPayload) -> Result<ProviderResponse> {
        let token = self.access_token().await?;
        self.send_with_token(&token, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_keys_in_order() {
        let content = "{{first.DATA}}\nWeather: {{keyword1.DATA}}\nNote: {{ keyword2.DATA }}\n{{remark.DATA}}";
        assert_eq!(
            extract_field_keys(content),
            vec!["first", "keyword1", "keyword2", "remark"]
        );
    }

    #[test]
    fn duplicate_keys_keep_first_position() {
        let content = "{{love.DATA}} {{time.DATA}} {{love.DATA}}";
        assert_eq!(extract_field_keys(content), vec!["love", "time"]);
    }

    #[test]
    fn ignores_markers_without_data_suffix() {
        assert!(extract_field_keys("Hello {{name}} and {{x.VALUE}}").is_empty());
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = AccessToken::new("secret-token");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
    }
}
