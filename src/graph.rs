use chrono::{DateTime, Local, TimeZone, Utc};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::Auth;
use crate::domain::Task;
use crate::events::{CalendarEvent, EventSource, SourceError, tasks_from_events};

const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
const GRAPH_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.0000000";
const PAGE_SIZE: &str = "999";

#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: String,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
	value: Vec<T>,
	#[serde(rename = "@odata.nextLink", default)]
	next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
	id: String,
	#[serde(default)]
	user_principal_name: Option<String>,
}

/// Reads calendar events through Microsoft Graph using client credentials.
#[derive(Debug, Clone)]
pub struct GraphSource {
	client: Client,
	auth: Auth,
}

impl GraphSource {
	pub fn new(auth: Auth) -> Self {
		Self {
			client: Client::new(),
			auth,
		}
	}

	fn access_token(&self) -> Result<String, SourceError> {
		let params = [
			("client_id", self.auth.client_id.as_str()),
			("client_secret", self.auth.client_secret.as_str()),
			("scope", GRAPH_SCOPE),
			("grant_type", "client_credentials"),
		];
		let response = self
			.client
			.post(token_url(&self.auth))
			.form(&params)
			.send()?;
		let token: TokenResponse = checked(response)?.json()?;
		Ok(token.access_token)
	}

	fn user_id(&self, token: &str, user_name: &str) -> Result<String, SourceError> {
		let url = format!("{GRAPH_BASE_URL}/users");
		let users: Vec<User> = self.get_all(token, &url, &[("$select", "id,userPrincipalName")])?;

		users
			.into_iter()
			.find(|user| user.user_principal_name.as_deref() == Some(user_name))
			.map(|user| user.id)
			.ok_or_else(|| SourceError::UnknownUser(user_name.to_string()))
	}

	fn calendar_events(
		&self,
		token: &str,
		user_id: &str,
		from: &DateTime<Local>,
		to: &DateTime<Local>,
	) -> Result<Vec<CalendarEvent>, SourceError> {
		let url = format!("{GRAPH_BASE_URL}/users/{user_id}/calendar/events");
		let filter = events_filter(from, to);
		self.get_all(
			token,
			&url,
			&[
				("$select", "subject,start,end,isAllDay"),
				("$filter", filter.as_str()),
				("$top", PAGE_SIZE),
			],
		)
	}

	// Follows `@odata.nextLink`; later links already carry the query.
	fn get_all<T: DeserializeOwned>(
		&self,
		token: &str,
		url: &str,
		query: &[(&str, &str)],
	) -> Result<Vec<T>, SourceError> {
		let mut items = Vec::new();
		let response = self.client.get(url).bearer_auth(token).query(query).send()?;
		let mut page: Page<T> = checked(response)?.json()?;

		loop {
			items.append(&mut page.value);
			let Some(next) = page.next_link.take() else {
				break;
			};
			debug!(next = %next, fetched = items.len(), "following next page");
			let response = self.client.get(&next).bearer_auth(token).send()?;
			page = checked(response)?.json()?;
		}

		Ok(items)
	}
}

impl EventSource for GraphSource {
	fn read(
		&self,
		user_name: &str,
		from: &DateTime<Local>,
		to: &DateTime<Local>,
	) -> Result<Vec<Task>, SourceError> {
		let token = self.access_token()?;
		let user_id = self.user_id(&token, user_name)?;
		let events = self.calendar_events(&token, &user_id, from, to)?;
		info!(user_name, count = events.len(), "fetched calendar events");

		tasks_from_events(&events, &Local)
	}
}

fn checked(response: Response) -> Result<Response, SourceError> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}

	let body = response.text().unwrap_or_default();
	Err(SourceError::Status {
		status: status.as_u16(),
		body,
	})
}

fn token_url(auth: &Auth) -> String {
	format!(
		"{}/{}/oauth2/v2.0/token",
		auth.instance.trim_end_matches('/'),
		auth.tenant_id
	)
}

/// Graph stores event times in UTC, so the range is converted before filtering.
fn events_filter<Tz: TimeZone>(from: &DateTime<Tz>, to: &DateTime<Tz>) -> String {
	let start = from.with_timezone(&Utc).format(GRAPH_TIMESTAMP_FORMAT);
	let end = to.with_timezone(&Utc).format(GRAPH_TIMESTAMP_FORMAT);
	format!("start/dateTime ge '{start}' and start/dateTime le '{end}' and isAllDay eq false")
}
