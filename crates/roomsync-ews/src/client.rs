//! The EWS client and its operations.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;

use roomsync_core::{Configuration, Credentials, Room};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::auth::{TokenCache, EXCHANGE_ONLINE_URL};
use crate::envelope;
use crate::error::{EwsError, EwsResult};
use crate::parse;
use crate::types::{Appointment, CalendarItem, SyncPage};
use crate::uid::global_object_id;

/// Time given to Exchange to process resource invitations after
/// `CreateItem`. Invitations are handled asynchronously server-side;
/// searching the attendee mailboxes earlier spuriously reports a
/// decline. Callers must wait this long between
/// [`EwsClient::create_appointment`] and
/// [`EwsClient::find_resource_events`].
pub const SETTLE_DELAY: Duration = Duration::from_secs(15);

enum Transport {
    OAuth(TokenCache),
    Ntlm {
        username: String,
        password: SecretString,
    },
}

/// A client bound to one configuration.
///
/// The DN→SMTP cache is per instance; the collector creates a fresh
/// client every pass, which bounds cache staleness to one pass.
pub struct EwsClient {
    http: reqwest::Client,
    endpoint: String,
    transport: Transport,
    service_user: String,
    address_cache: Mutex<HashMap<String, String>>,
}

impl EwsClient {
    /// Build a client from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EwsError::Config`] when the configuration carries
    /// neither complete OAuth nor complete NTLM credentials, and
    /// [`EwsError::Http`] when the HTTP client cannot be constructed.
    pub fn new(config: &Configuration) -> EwsResult<Self> {
        let (endpoint, transport) = match config.credentials()? {
            Credentials::OAuth {
                client_id,
                client_secret,
                tenant_id,
            } => (
                EXCHANGE_ONLINE_URL.to_string(),
                Transport::OAuth(TokenCache::new(client_id, client_secret, tenant_id)),
            ),
            Credentials::Ntlm {
                username,
                password,
                ews_url,
            } => (ews_url, Transport::Ntlm { username, password }),
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout.max(1) as u64))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            transport,
            service_user: config.service_user_upn.clone(),
            address_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Send a SOAP body and return the raw response body after the
    /// fault pass.
    async fn send(&self, body: String) -> EwsResult<String> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "text/xml; charset=utf-8")
            .body(body);

        match &self.transport {
            Transport::OAuth(tokens) => {
                request = request.bearer_auth(tokens.get_token().await?);
            }
            Transport::Ntlm { username, password } => {
                request = request.basic_auth(username, Some(password.expose_secret()));
            }
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if let Some(fault) = parse::parse_fault(&text)? {
            if fault.is_non_existent_mailbox() {
                return Err(EwsError::NonExistentMailbox);
            }
            return Err(EwsError::Fault {
                response_code: fault.response_code,
                message: fault.message,
            });
        }
        if !status.is_success() {
            return Err(EwsError::UnexpectedResponse(format!(
                "HTTP {status} without SOAP fault"
            )));
        }
        Ok(text)
    }

    /// List the rooms of a room list, impersonating the service user.
    pub async fn get_rooms(&self, room_list_upn: &str) -> EwsResult<Vec<Room>> {
        let response = self
            .send(envelope::get_rooms(&self.service_user, room_list_upn))
            .await?;
        parse::parse_get_rooms(&response)
    }

    /// Fetch one page of calendar changes for a room mailbox.
    ///
    /// An empty `sync_state` starts from the beginning of the folder
    /// history. The page is capped at 256 changes; callers loop until
    /// `includes_last_item` is true, persisting the returned cookie
    /// each round. Changes that are not calendar items, or calendar
    /// items missing start, end or organizer, are dropped with a
    /// debug log; they are EWS scaffolding, not bookable events.
    pub async fn sync_folder_items(
        &self,
        room_mailbox: &str,
        sync_state: &str,
    ) -> EwsResult<SyncPage> {
        let response = self
            .send(envelope::sync_folder_items(room_mailbox, sync_state))
            .await?;
        let raw = parse::parse_sync_page(&response)?;

        if raw.skipped_non_calendar > 0 {
            debug!(
                room = room_mailbox,
                count = raw.skipped_non_calendar,
                "skipped non-calendar changes"
            );
        }

        let mut page = SyncPage {
            sync_state: raw.sync_state,
            includes_last_item: raw.includes_last_item,
            deletes: raw.deletes,
            ..SyncPage::default()
        };
        for raw_item in raw.creates {
            if let Some(item) = validate_item(raw_item) {
                page.creates.push(item);
            }
        }
        for raw_item in raw.updates {
            if let Some(item) = validate_item(raw_item) {
                page.updates.push(item);
            }
        }
        Ok(page)
    }

    /// Expand a recurring master into its dated instances.
    ///
    /// Iterates `OccurrenceItemId` from instance index 1 upward until
    /// the server reports the index out of range. Occurrences deleted
    /// from the series are skipped; the loop continues past them.
    pub async fn expand_recurring_master(
        &self,
        master_id: &str,
        room_mailbox: &str,
    ) -> EwsResult<Vec<CalendarItem>> {
        let mut items = Vec::new();
        let mut instance_index = 0;

        loop {
            instance_index += 1;
            let response = self
                .send(envelope::get_occurrence(
                    room_mailbox,
                    master_id,
                    instance_index,
                ))
                .await?;
            let outcome = parse::parse_get_item(&response)?;

            match outcome.response_code.as_str() {
                "ErrorCalendarOccurrenceIndexIsOutOfRecurrenceRange" => break,
                "ErrorCalendarOccurrenceIsDeletedFromRecurrence" => continue,
                _ => {}
            }
            if outcome.response_class != "Success" {
                return Err(EwsError::UnexpectedResponse(format!(
                    "GetItem failed: {}",
                    outcome.response_code
                )));
            }
            let raw_item = outcome.item.ok_or_else(|| {
                EwsError::UnexpectedResponse("GetItem succeeded without an item".into())
            })?;
            let Some(mut item) = validate_item(raw_item) else {
                warn!(
                    master = master_id,
                    instance_index, "occurrence missing start, end or organizer"
                );
                continue;
            };
            item.instance_index = instance_index;
            items.push(item);
        }

        Ok(items)
    }

    /// Create an appointment on behalf of its organizer, inviting
    /// every attendee, and return the calendar UID of the organizer's
    /// copy.
    ///
    /// Resource acceptance happens asynchronously; wait
    /// [`SETTLE_DELAY`] before calling
    /// [`find_resource_events`](Self::find_resource_events).
    pub async fn create_appointment(&self, appointment: &Appointment) -> EwsResult<String> {
        let response = self
            .send(envelope::create_appointment(
                &appointment.organizer,
                &appointment.subject,
                &appointment.start,
                &appointment.end,
                &appointment.location,
                &appointment.attendees,
            ))
            .await?;
        let outcome = parse::parse_create_item(&response)?;
        let (item_id, _) = outcome.item_id.ok_or_else(|| {
            EwsError::UnexpectedResponse(format!(
                "CreateItem returned no item: {} - {}",
                outcome.response_class, outcome.response_code
            ))
        })?;

        self.get_uid_from_item_id(&appointment.organizer, &item_id)
            .await
    }

    /// Search each attendee mailbox for the event with the given UID
    /// and return the per-mailbox event ids, in attendee order.
    ///
    /// # Errors
    ///
    /// Returns [`EwsError::Declined`] when any attendee mailbox has no
    /// matching event, meaning the resource declined the invitation.
    pub async fn find_resource_events(
        &self,
        uid: &str,
        attendees: &[String],
    ) -> EwsResult<Vec<String>> {
        let mut resource_event_ids = Vec::with_capacity(attendees.len());
        for attendee in attendees {
            match self.find_event_in_mailbox(attendee, uid).await {
                Ok((item_id, _)) => resource_event_ids.push(item_id),
                Err(EwsError::EventNotFound) => return Err(EwsError::Declined),
                Err(e) => return Err(e),
            }
        }
        Ok(resource_event_ids)
    }

    /// Cancel a whole event from the organizer's mailbox, notifying
    /// all attendees.
    pub async fn cancel_event(&self, organizer: &str, uid: &str) -> EwsResult<()> {
        let (item_id, change_key) = self.find_event_in_mailbox(organizer, uid).await?;
        let response = self
            .send(envelope::cancel_event(organizer, &item_id, &change_key))
            .await?;
        let status = parse::parse_response_status(&response)?;
        if !status.is_success() {
            return Err(EwsError::UnexpectedResponse(format!(
                "cancelling event resulted in {} - {}",
                status.response_class, status.response_code
            )));
        }
        Ok(())
    }

    /// Cancel one occurrence of a recurring series from the
    /// organizer's mailbox.
    pub async fn cancel_occurrence(
        &self,
        organizer: &str,
        uid: &str,
        instance_index: i32,
    ) -> EwsResult<()> {
        let (master_id, _) = self.find_event_in_mailbox(organizer, uid).await?;
        let response = self
            .send(envelope::delete_occurrence(
                organizer,
                &master_id,
                instance_index,
            ))
            .await?;
        let status = parse::parse_response_status(&response)?;
        if !status.is_success() {
            return Err(EwsError::UnexpectedResponse(format!(
                "cancelling occurrence resulted in {} - {}",
                status.response_class, status.response_code
            )));
        }
        Ok(())
    }

    /// Translate a legacy distinguished name to an SMTP address.
    ///
    /// Addresses already in SMTP form pass through. Results are cached
    /// for the lifetime of this client instance.
    pub async fn resolve_dn(&self, name: &str) -> EwsResult<String> {
        if let Some(cached) = self.address_cache.lock().await.get(name) {
            return Ok(cached.clone());
        }
        // The sync feed sometimes carries SMTP addresses directly.
        if name.contains('@') {
            self.cache_address(name, name).await;
            return Ok(name.to_string());
        }

        let response = self
            .send(envelope::resolve_names(&self.service_user, name))
            .await?;
        let addresses = parse::parse_resolve_names(&response)?;
        if addresses.len() != 1 {
            return Err(EwsError::UnexpectedResponse(format!(
                "ResolveNames returned {} != 1 resolutions for '{name}'",
                addresses.len()
            )));
        }

        let Some(smtp) = addresses.into_iter().next() else {
            return Err(EwsError::UnexpectedResponse(
                "ResolveNames returned an empty resolution".into(),
            ));
        };
        self.cache_address(name, &smtp).await;
        Ok(smtp)
    }

    async fn cache_address(&self, name: &str, smtp: &str) {
        self.address_cache
            .lock()
            .await
            .insert(name.to_string(), smtp.to_string());
    }

    /// Find the event with the given UID in a mailbox via its
    /// GlobalObjectId and return `(item_id, change_key)`.
    pub async fn find_event_in_mailbox(
        &self,
        mailbox: &str,
        uid: &str,
    ) -> EwsResult<(String, String)> {
        let restriction_value = global_object_id(uid)?;
        let response = self
            .send(envelope::find_by_global_object_id(
                mailbox,
                &restriction_value,
            ))
            .await?;
        let mut found = parse::parse_find_item(&response)?;
        if found.is_empty() {
            return Err(EwsError::EventNotFound);
        }
        Ok(found.swap_remove(0))
    }

    async fn get_uid_from_item_id(&self, mailbox: &str, item_id: &str) -> EwsResult<String> {
        let response = self.send(envelope::get_uid(mailbox, item_id)).await?;
        let outcome = parse::parse_get_item(&response)?;
        let uid = outcome.item.map(|i| i.uid).unwrap_or_default();
        if uid.is_empty() {
            return Err(EwsError::UnexpectedResponse(
                "UID not found in GetItem response".into(),
            ));
        }
        Ok(uid)
    }
}

/// Promote a raw wire item to a typed calendar item, dropping
/// scaffolding that has no start, end or organizer.
fn validate_item(raw: parse::RawCalendarItem) -> Option<CalendarItem> {
    let (Some(start), Some(end)) = (raw.start, raw.end) else {
        debug!(item = %raw.item_id, "calendar item has no start or end");
        return None;
    };
    if raw.organizer_email.is_empty() {
        debug!(item = %raw.item_id, "calendar item has no organizer");
        return None;
    }
    Some(CalendarItem {
        item_id: raw.item_id,
        change_key: raw.change_key,
        uid: raw.uid,
        subject: raw.subject,
        instance_index: 0,
        start,
        end,
        organizer_email: raw.organizer_email,
        calendar_item_type: raw.calendar_item_type,
    })
}
