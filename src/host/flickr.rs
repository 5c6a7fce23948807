//! Flickr client over blocking `reqwest`.
//!
//! REST methods are signed `POST`s to `api.flickr.com/services/rest/` with
//! `format=json&nojsoncallback=1`. A JSON body with `"stat": "fail"` becomes
//! [`HostError::Api`]. Uploads are multipart `POST`s whose reply is a small
//! XML document carrying either `<photoid>` or `<err code msg>`.

use super::oauth::{self, Credentials};
use super::{HostError, PhotoHost, RemoteAlbum, UploadRequest};
use crate::config::FlickrConfig;
use chrono::{DateTime, FixedOffset};
use reqwest::blocking::{Client, multipart};
use serde_json::Value;

const REST_URL: &str = "https://api.flickr.com/services/rest/";
const UPLOAD_URL: &str = "https://up.flickr.com/services/upload/";
const ALBUMS_PER_PAGE: u32 = 500;

pub struct FlickrClient {
    credentials: Credentials,
    user_nsid: String,
    http: Client,
}

impl FlickrClient {
    /// Build a client from `[flickr]`. Credentials are not checked here;
    /// see [`FlickrConfig::require_credentials`].
    pub fn new(config: &FlickrConfig) -> Self {
        Self {
            credentials: Credentials {
                consumer_key: config.api_key.clone(),
                consumer_secret: config.api_secret.clone(),
                token: config.oauth_token.clone(),
                token_secret: config.oauth_token_secret.clone(),
            },
            user_nsid: config.user_nsid.clone(),
            http: Client::new(),
        }
    }

    fn sign(&self, url: &str, params: Vec<(String, String)>) -> Vec<(String, String)> {
        oauth::signed_params(
            &self.credentials,
            "POST",
            url,
            &params,
            &oauth::nonce(),
            chrono::Utc::now().timestamp(),
        )
    }

    /// Call a REST method and return the response body on `stat=ok`.
    fn call(&self, method: &str, args: &[(&str, &str)]) -> Result<Value, HostError> {
        let mut params = vec![
            ("method".to_string(), method.to_string()),
            ("format".to_string(), "json".to_string()),
            ("nojsoncallback".to_string(), "1".to_string()),
        ];
        params.extend(args.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        log::debug!("flickr {method} {args:?}");

        let response = self
            .http
            .post(REST_URL)
            .form(&self.sign(REST_URL, params))
            .send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(HostError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        parse_rest_response(&text)
    }
}

impl PhotoHost for FlickrClient {
    fn upload(&self, request: &UploadRequest) -> Result<String, HostError> {
        let mut form = multipart::Form::new();
        for (k, v) in self.sign(UPLOAD_URL, upload_fields(request)) {
            form = form.text(k, v);
        }
        form = form.file("photo", &request.path)?;
        log::debug!("flickr upload {}", request.path.display());

        let response = self.http.post(UPLOAD_URL).multipart(form).send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(HostError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        parse_upload_response(&text)
    }

    fn create_album(&self, title: &str, primary_photo_id: &str) -> Result<String, HostError> {
        let body = self.call(
            "flickr.photosets.create",
            &[("title", title), ("primary_photo_id", primary_photo_id)],
        )?;
        body["photoset"]["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| HostError::UnexpectedResponse("photoset id missing".into()))
    }

    fn add_photo_to_album(&self, album_id: &str, photo_id: &str) -> Result<(), HostError> {
        self.call(
            "flickr.photosets.addPhoto",
            &[("photoset_id", album_id), ("photo_id", photo_id)],
        )?;
        Ok(())
    }

    fn set_posted_date(
        &self,
        photo_id: &str,
        posted: DateTime<FixedOffset>,
    ) -> Result<(), HostError> {
        let date_posted = posted.timestamp().to_string();
        self.call(
            "flickr.photos.setDates",
            &[("photo_id", photo_id), ("date_posted", &date_posted)],
        )?;
        Ok(())
    }

    fn list_albums(&self) -> Result<Vec<RemoteAlbum>, HostError> {
        let mut albums = Vec::new();
        let per_page = ALBUMS_PER_PAGE.to_string();
        let mut page = 1u32;
        loop {
            let page_str = page.to_string();
            let mut args = vec![("page", page_str.as_str()), ("per_page", per_page.as_str())];
            if !self.user_nsid.is_empty() {
                args.push(("user_id", self.user_nsid.as_str()));
            }
            let body = self.call("flickr.photosets.getList", &args)?;
            let (items, pages) = parse_album_page(&body)?;
            albums.extend(items);
            if page >= pages {
                break;
            }
            page += 1;
        }
        Ok(albums)
    }
}

/// Each tag double-quoted so multi-word keywords survive, space separated.
pub fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .map(|t| format!("\"{}\"", t.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" ")
}

fn flag(b: bool) -> String {
    let s = if b { "1" } else { "0" };
    s.to_string()
}

/// Non-file upload fields. All of them are covered by the signature.
pub(crate) fn upload_fields(request: &UploadRequest) -> Vec<(String, String)> {
    vec![
        ("title".into(), request.title.clone()),
        ("description".into(), request.description.clone()),
        ("tags".into(), format_tags(&request.tags)),
        ("is_public".into(), flag(request.privacy.public)),
        ("is_friend".into(), flag(request.privacy.friends)),
        ("is_family".into(), flag(request.privacy.family)),
        ("content_type".into(), "1".into()),
        ("hidden".into(), "1".into()),
        ("safety_level".into(), "1".into()),
    ]
}

pub(crate) fn parse_rest_response(text: &str) -> Result<Value, HostError> {
    let body: Value = serde_json::from_str(text)?;
    match body["stat"].as_str() {
        Some("ok") => Ok(body),
        Some("fail") => Err(HostError::Api {
            code: body["code"].as_i64().unwrap_or(0),
            message: body["message"].as_str().unwrap_or("unknown error").to_string(),
        }),
        _ => Err(HostError::UnexpectedResponse(text.to_string())),
    }
}

/// Photo id from the upload reply, or the error it carries.
pub(crate) fn parse_upload_response(xml: &str) -> Result<String, HostError> {
    if let Some(id) = element_text(xml, "photoid") {
        return Ok(id.trim().to_string());
    }
    if let Some(err) = xml.find("<err ").map(|i| &xml[i..]) {
        let end = err.find('>').unwrap_or(err.len());
        let tag = &err[..end];
        return Err(HostError::Api {
            code: attribute(tag, "code")
                .and_then(|c| c.parse().ok())
                .unwrap_or(0),
            message: attribute(tag, "msg").unwrap_or_else(|| "upload failed".to_string()),
        });
    }
    Err(HostError::UnexpectedResponse(xml.to_string()))
}

/// Text content of the first `<name>` element, nested tags dropped.
fn element_text(xml: &str, name: &str) -> Option<String> {
    let open = format!("<{name}");
    let start = xml.find(&open)?;
    let content_start = start + xml[start..].find('>')? + 1;
    let close = format!("</{name}>");
    let len = xml[content_start..].find(&close)?;

    let mut text = String::new();
    let mut rest = &xml[content_start..content_start + len];
    while let Some(lt) = rest.find('<') {
        text.push_str(&rest[..lt]);
        rest = rest[lt..].find('>').map_or("", |gt| &rest[lt + gt + 1..]);
    }
    text.push_str(rest);
    Some(unescape(&text))
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let key = format!("{name}=\"");
    let start = tag.find(&key)? + key.len();
    let len = tag[start..].find('"')?;
    Some(unescape(&tag[start..start + len]))
}

/// Resolve the predefined XML entities and numeric character references.
/// Anything unrecognised is kept as written.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';') else { break };
        let resolved = match &rest[1..semi] {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            entity => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| entity.strip_prefix('#').map(str::parse))
                .and_then(|code| code.ok())
                .and_then(char::from_u32),
        };
        match resolved {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// One page of `flickr.photosets.getList`: the albums and the page count.
pub(crate) fn parse_album_page(body: &Value) -> Result<(Vec<RemoteAlbum>, u32), HostError> {
    let sets = &body["photosets"];
    let items = sets["photoset"]
        .as_array()
        .ok_or_else(|| HostError::UnexpectedResponse("photosets missing".into()))?;

    let albums = items
        .iter()
        .filter_map(|set| {
            let id = set["id"].as_str()?.to_string();
            let title = set["title"]["_content"]
                .as_str()
                .or_else(|| set["title"].as_str())
                .unwrap_or_default()
                .to_string();
            Some(RemoteAlbum {
                id,
                title,
                photos: number(&set["photos"]),
            })
        })
        .collect();
    Ok((albums, number(&sets["pages"]).max(1)))
}

/// Flickr sends counts as numbers or as numeric strings.
fn number(value: &Value) -> u32 {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .unwrap_or(0) as u32
}
