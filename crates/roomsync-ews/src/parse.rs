//! EWS response parsers.
//!
//! Hand-rolled `quick-xml` event loops keyed on local element names,
//! so responses parse identically whatever namespace prefixes the
//! server chooses. Every response goes through [`parse_fault`] first;
//! the shape parsers assume the fault pass came back empty.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use roomsync_core::Room;

use crate::error::EwsResult;

fn name_of(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attr_of(e: &BytesStart, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key.as_bytes())
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

fn reader_for(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader
}

/// A decoded SOAP fault.
#[derive(Debug, Clone, Default)]
pub(crate) struct SoapFault {
    pub fault_code: String,
    pub response_code: String,
    pub message: String,
}

impl SoapFault {
    /// Whether the fault names a non-existent mailbox, in either the
    /// fault code or the detail response code.
    pub(crate) fn is_non_existent_mailbox(&self) -> bool {
        self.fault_code.ends_with("ErrorNonExistentMailbox")
            || self.response_code == "ErrorNonExistentMailbox"
    }
}

/// First pass over any response: decode a SOAP fault if one is
/// present. Returns `None` for non-fault responses.
pub(crate) fn parse_fault(xml: &str) -> EwsResult<Option<SoapFault>> {
    let mut reader = reader_for(xml);
    let mut fault = SoapFault::default();
    let mut in_fault = false;
    let mut in_detail = false;
    let mut current = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = name_of(&e);
                if name == "Fault" {
                    in_fault = true;
                }
                if in_fault && name == "detail" {
                    in_detail = true;
                }
                current = name;
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == "Fault" {
                    in_fault = false;
                }
                if name == "detail" {
                    in_detail = false;
                }
                current.clear();
            }
            Event::Text(t) if in_fault => {
                let value = t.unescape()?.into_owned();
                match current.as_str() {
                    "faultcode" => fault.fault_code = value,
                    "ResponseCode" if in_detail => fault.response_code = value,
                    "Message" if in_detail => fault.message = value,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if fault.fault_code.is_empty() && fault.response_code.is_empty() {
        Ok(None)
    } else {
        Ok(Some(fault))
    }
}

/// ResponseClass/ResponseCode of the first response message in a
/// payload, whatever the operation.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResponseStatus {
    pub response_class: String,
    pub response_code: String,
}

impl ResponseStatus {
    pub(crate) fn is_success(&self) -> bool {
        self.response_class == "Success" && self.response_code == "NoError"
    }
}

pub(crate) fn parse_response_status(xml: &str) -> EwsResult<ResponseStatus> {
    let mut reader = reader_for(xml);
    let mut status = ResponseStatus::default();
    let mut in_message = false;
    let mut expect_code = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let name = name_of(&e);
                if !in_message && name.ends_with("ResponseMessage") {
                    in_message = true;
                    status.response_class = attr_of(&e, "ResponseClass").unwrap_or_default();
                }
                expect_code = in_message && name == "ResponseCode";
            }
            Event::Text(t) if expect_code => {
                status.response_code = t.unescape()?.into_owned();
                break;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(status)
}

/// A calendar item as it appears on the wire, before validation.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawCalendarItem {
    pub item_id: String,
    pub change_key: String,
    pub uid: String,
    pub subject: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub organizer_email: String,
    pub calendar_item_type: String,
}

impl RawCalendarItem {
    fn capture_text(&mut self, stack: &[String], value: String) {
        let Some(last) = stack.last().map(String::as_str) else {
            return;
        };
        match last {
            "UID" => self.uid = value,
            "Subject" => self.subject = value,
            "Start" => self.start = parse_timestamp(&value),
            "End" => self.end = parse_timestamp(&value),
            "CalendarItemType" => self.calendar_item_type = value,
            "EmailAddress" if path_ends(stack, &["Organizer", "Mailbox", "EmailAddress"]) => {
                self.organizer_email = value;
            }
            _ => {}
        }
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn path_ends(stack: &[String], suffix: &[&str]) -> bool {
    stack.len() >= suffix.len()
        && stack[stack.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a == b)
}

/// One page of `SyncFolderItems`, unvalidated.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawSyncPage {
    pub sync_state: String,
    pub includes_last_item: bool,
    pub creates: Vec<RawCalendarItem>,
    pub updates: Vec<RawCalendarItem>,
    pub deletes: Vec<String>,
    /// Direct children of Create/Update that were not calendar items
    /// (EWS also streams plain messages through calendar folders).
    pub skipped_non_calendar: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Create,
    Update,
    Delete,
}

pub(crate) fn parse_sync_page(xml: &str) -> EwsResult<RawSyncPage> {
    let mut reader = reader_for(xml);
    let mut page = RawSyncPage::default();
    let mut stack: Vec<String> = Vec::new();
    let mut section: Option<Section> = None;
    let mut section_depth = 0usize;
    let mut item: Option<RawCalendarItem> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = name_of(&e);
                stack.push(name.clone());
                sync_element(
                    &name,
                    &e,
                    stack.len(),
                    &mut page,
                    &mut section,
                    &mut section_depth,
                    &mut item,
                );
            }
            Event::Empty(e) => {
                let name = name_of(&e);
                sync_element(
                    &name,
                    &e,
                    stack.len() + 1,
                    &mut page,
                    &mut section,
                    &mut section_depth,
                    &mut item,
                );
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.pop();
                if name == "CalendarItem" {
                    if let (Some(kind), Some(finished)) = (section, item.take()) {
                        match kind {
                            Section::Create => page.creates.push(finished),
                            Section::Update => page.updates.push(finished),
                            Section::Delete => {}
                        }
                    }
                }
                if section.is_some() && matches!(name.as_str(), "Create" | "Update" | "Delete") {
                    section = None;
                }
            }
            Event::Text(t) => {
                let value = t.unescape()?.into_owned();
                if let Some(building) = item.as_mut() {
                    building.capture_text(&stack, value);
                } else {
                    match stack.last().map(String::as_str) {
                        Some("SyncState") => page.sync_state = value,
                        Some("IncludesLastItemInRange") => {
                            page.includes_last_item = value == "true";
                        }
                        _ => {}
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(page)
}

#[allow(clippy::too_many_arguments)]
fn sync_element(
    name: &str,
    e: &BytesStart,
    depth: usize,
    page: &mut RawSyncPage,
    section: &mut Option<Section>,
    section_depth: &mut usize,
    item: &mut Option<RawCalendarItem>,
) {
    match name {
        "Create" | "Update" | "Delete" if section.is_none() => {
            *section = Some(match name {
                "Create" => Section::Create,
                "Update" => Section::Update,
                _ => Section::Delete,
            });
            *section_depth = depth;
        }
        _ => {
            let Some(kind) = *section else { return };
            if depth == *section_depth + 1 {
                // Direct child of the change element.
                match (kind, name) {
                    (Section::Delete, "ItemId") => {
                        if let Some(id) = attr_of(e, "Id") {
                            page.deletes.push(id);
                        }
                    }
                    (Section::Create | Section::Update, "CalendarItem") => {
                        *item = Some(RawCalendarItem::default());
                    }
                    (Section::Create | Section::Update, _) => {
                        page.skipped_non_calendar += 1;
                    }
                    _ => {}
                }
            } else if name == "ItemId" {
                if let Some(building) = item.as_mut() {
                    building.item_id = attr_of(e, "Id").unwrap_or_default();
                    building.change_key = attr_of(e, "ChangeKey").unwrap_or_default();
                }
            }
        }
    }
}

/// Outcome of a `GetItem` call.
#[derive(Debug, Clone, Default)]
pub(crate) struct GetItemOutcome {
    pub response_class: String,
    pub response_code: String,
    pub item: Option<RawCalendarItem>,
}

pub(crate) fn parse_get_item(xml: &str) -> EwsResult<GetItemOutcome> {
    let mut reader = reader_for(xml);
    let mut outcome = GetItemOutcome::default();
    let mut stack: Vec<String> = Vec::new();
    let mut item: Option<RawCalendarItem> = None;
    let mut expect_code = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = name_of(&e);
                stack.push(name.clone());
                if name.ends_with("ResponseMessage") && outcome.response_class.is_empty() {
                    outcome.response_class = attr_of(&e, "ResponseClass").unwrap_or_default();
                }
                expect_code = name == "ResponseCode" && outcome.response_code.is_empty();
                if name == "CalendarItem" {
                    item = Some(RawCalendarItem::default());
                }
            }
            Event::Empty(e) => {
                if name_of(&e) == "ItemId" {
                    if let Some(building) = item.as_mut() {
                        building.item_id = attr_of(&e, "Id").unwrap_or_default();
                        building.change_key = attr_of(&e, "ChangeKey").unwrap_or_default();
                    }
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.pop();
                if name == "CalendarItem" && outcome.item.is_none() {
                    outcome.item = item.take();
                }
            }
            Event::Text(t) => {
                let value = t.unescape()?.into_owned();
                if expect_code {
                    outcome.response_code = value;
                    expect_code = false;
                } else if let Some(building) = item.as_mut() {
                    building.capture_text(&stack, value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(outcome)
}

/// Outcome of a `CreateItem` call.
#[derive(Debug, Clone, Default)]
pub(crate) struct CreateItemOutcome {
    pub response_class: String,
    pub response_code: String,
    pub item_id: Option<(String, String)>,
}

pub(crate) fn parse_create_item(xml: &str) -> EwsResult<CreateItemOutcome> {
    let mut reader = reader_for(xml);
    let mut outcome = CreateItemOutcome::default();
    let mut in_item = false;
    let mut expect_code = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let name = name_of(&e);
                if name.ends_with("ResponseMessage") && outcome.response_class.is_empty() {
                    outcome.response_class = attr_of(&e, "ResponseClass").unwrap_or_default();
                }
                expect_code = name == "ResponseCode" && outcome.response_code.is_empty();
                if name == "CalendarItem" {
                    in_item = true;
                }
                if in_item && name == "ItemId" && outcome.item_id.is_none() {
                    outcome.item_id = Some((
                        attr_of(&e, "Id").unwrap_or_default(),
                        attr_of(&e, "ChangeKey").unwrap_or_default(),
                    ));
                }
            }
            Event::Text(t) if expect_code => {
                outcome.response_code = t.unescape()?.into_owned();
                expect_code = false;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(outcome)
}

/// ItemId/ChangeKey pairs of the calendar items a `FindItem` returned.
pub(crate) fn parse_find_item(xml: &str) -> EwsResult<Vec<(String, String)>> {
    let mut reader = reader_for(xml);
    let mut found = Vec::new();
    let mut in_item = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let name = name_of(&e);
                if name == "CalendarItem" {
                    in_item = true;
                }
                if in_item && name == "ItemId" {
                    found.push((
                        attr_of(&e, "Id").unwrap_or_default(),
                        attr_of(&e, "ChangeKey").unwrap_or_default(),
                    ));
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"CalendarItem" {
                    in_item = false;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(found)
}

/// Rooms of a `GetRooms` response.
pub(crate) fn parse_get_rooms(xml: &str) -> EwsResult<Vec<Room>> {
    let mut reader = reader_for(xml);
    let mut rooms = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut email = String::new();
    let mut name = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(name_of(&e)),
            Event::End(e) => {
                if e.local_name().as_ref() == b"Room" {
                    if !email.is_empty() {
                        rooms.push(Room {
                            email: std::mem::take(&mut email),
                            name: std::mem::take(&mut name),
                        });
                    } else {
                        email.clear();
                        name.clear();
                    }
                }
                stack.pop();
            }
            Event::Text(t) => {
                let value = t.unescape()?.into_owned();
                if path_ends(&stack, &["Room", "Id", "EmailAddress"]) {
                    email = value;
                } else if path_ends(&stack, &["Room", "Id", "Name"]) {
                    name = value;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rooms)
}

/// Mailbox addresses resolved by `ResolveNames`, one per resolution.
pub(crate) fn parse_resolve_names(xml: &str) -> EwsResult<Vec<String>> {
    let mut reader = reader_for(xml);
    let mut addresses = Vec::new();
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(name_of(&e)),
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(t) => {
                if path_ends(&stack, &["Resolution", "Mailbox", "EmailAddress"]) {
                    addresses.push(t.unescape()?.into_owned());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAULT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <s:Fault>
      <faultcode xmlns:a="http://schemas.microsoft.com/exchange/services/2006/types">a:ErrorNonExistentMailbox</faultcode>
      <faultstring xml:lang="en-US">The SMTP address has no mailbox associated with it.</faultstring>
      <detail>
        <e:ResponseCode xmlns:e="http://schemas.microsoft.com/exchange/services/2006/errors">ErrorNonExistentMailbox</e:ResponseCode>
        <e:Message xmlns:e="http://schemas.microsoft.com/exchange/services/2006/errors">The SMTP address has no mailbox associated with it.</e:Message>
      </detail>
    </s:Fault>
  </s:Body>
</s:Envelope>"#;

    const SYNC_PAGE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <m:SyncFolderItemsResponse xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
      <m:ResponseMessages>
        <m:SyncFolderItemsResponseMessage ResponseClass="Success">
          <m:ResponseCode>NoError</m:ResponseCode>
          <m:SyncState>H4sIAAA=</m:SyncState>
          <m:IncludesLastItemInRange>true</m:IncludesLastItemInRange>
          <m:Changes>
            <t:Create>
              <t:CalendarItem>
                <t:ItemId Id="item-1" ChangeKey="ck-1" />
                <t:Subject>Standup</t:Subject>
                <t:Start>2024-01-02T10:00:00Z</t:Start>
                <t:End>2024-01-02T10:30:00Z</t:End>
                <t:UID>AABB01</t:UID>
                <t:Organizer>
                  <t:Mailbox>
                    <t:Name>Alice</t:Name>
                    <t:EmailAddress>alice@x.test</t:EmailAddress>
                  </t:Mailbox>
                </t:Organizer>
                <t:CalendarItemType>Single</t:CalendarItemType>
              </t:CalendarItem>
            </t:Create>
            <t:Create>
              <t:Message>
                <t:ItemId Id="msg-1" ChangeKey="ck-m" />
                <t:Subject>Let's go for lunch</t:Subject>
              </t:Message>
            </t:Create>
            <t:Update>
              <t:CalendarItem>
                <t:ItemId Id="item-2" ChangeKey="ck-2" />
                <t:Subject>Review</t:Subject>
                <t:Start>2024-01-03T09:00:00Z</t:Start>
                <t:End>2024-01-03T09:45:00Z</t:End>
                <t:UID>AABB02</t:UID>
                <t:Organizer>
                  <t:Mailbox>
                    <t:EmailAddress>/o=Org/ou=Unit/cn=Recipients/cn=bob</t:EmailAddress>
                  </t:Mailbox>
                </t:Organizer>
                <t:CalendarItemType>RecurringMaster</t:CalendarItemType>
              </t:CalendarItem>
            </t:Update>
            <t:Delete>
              <t:ItemId Id="item-3" ChangeKey="ck-3" />
            </t:Delete>
          </m:Changes>
        </m:SyncFolderItemsResponseMessage>
      </m:ResponseMessages>
    </m:SyncFolderItemsResponse>
  </s:Body>
</s:Envelope>"#;

    #[test]
    fn fault_pass_decodes_code_and_message() {
        let fault = parse_fault(FAULT).unwrap().expect("fault present");
        assert!(fault.is_non_existent_mailbox());
        assert_eq!(fault.response_code, "ErrorNonExistentMailbox");
        assert!(fault.message.contains("no mailbox"));
    }

    #[test]
    fn fault_pass_is_empty_on_success_responses() {
        assert!(parse_fault(SYNC_PAGE).unwrap().is_none());
    }

    #[test]
    fn sync_page_partitions_changes() {
        let page = parse_sync_page(SYNC_PAGE).unwrap();
        assert_eq!(page.sync_state, "H4sIAAA=");
        assert!(page.includes_last_item);
        assert_eq!(page.creates.len(), 1);
        assert_eq!(page.updates.len(), 1);
        assert_eq!(page.deletes, vec!["item-3".to_string()]);
        assert_eq!(page.skipped_non_calendar, 1);

        let created = &page.creates[0];
        assert_eq!(created.item_id, "item-1");
        assert_eq!(created.change_key, "ck-1");
        assert_eq!(created.uid, "AABB01");
        assert_eq!(created.organizer_email, "alice@x.test");
        assert_eq!(created.calendar_item_type, "Single");
        assert!(created.start.is_some() && created.end.is_some());

        let updated = &page.updates[0];
        assert_eq!(updated.calendar_item_type, "RecurringMaster");
        assert!(updated.organizer_email.starts_with("/o=Org"));
    }

    #[test]
    fn get_item_reports_recurrence_bound_codes() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <m:GetItemResponse xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages">
      <m:ResponseMessages>
        <m:GetItemResponseMessage ResponseClass="Error">
          <m:MessageText>Out of range.</m:MessageText>
          <m:ResponseCode>ErrorCalendarOccurrenceIndexIsOutOfRecurrenceRange</m:ResponseCode>
          <m:Items />
        </m:GetItemResponseMessage>
      </m:ResponseMessages>
    </m:GetItemResponse>
  </s:Body>
</s:Envelope>"#;
        let outcome = parse_get_item(xml).unwrap();
        assert_eq!(outcome.response_class, "Error");
        assert_eq!(
            outcome.response_code,
            "ErrorCalendarOccurrenceIndexIsOutOfRecurrenceRange"
        );
        assert!(outcome.item.is_none());
    }

    #[test]
    fn get_item_decodes_the_occurrence() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <m:GetItemResponse xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
      <m:ResponseMessages>
        <m:GetItemResponseMessage ResponseClass="Success">
          <m:ResponseCode>NoError</m:ResponseCode>
          <m:Items>
            <t:CalendarItem>
              <t:ItemId Id="occ-1" ChangeKey="ck-o1" />
              <t:UID>AABB02</t:UID>
              <t:Subject>Review</t:Subject>
              <t:Start>2024-01-03T09:00:00Z</t:Start>
              <t:End>2024-01-03T09:45:00Z</t:End>
              <t:CalendarItemType>Occurrence</t:CalendarItemType>
            </t:CalendarItem>
          </m:Items>
        </m:GetItemResponseMessage>
      </m:ResponseMessages>
    </m:GetItemResponse>
  </s:Body>
</s:Envelope>"#;
        let outcome = parse_get_item(xml).unwrap();
        assert_eq!(outcome.response_class, "Success");
        let item = outcome.item.expect("item");
        assert_eq!(item.item_id, "occ-1");
        assert_eq!(item.calendar_item_type, "Occurrence");
    }

    #[test]
    fn create_item_yields_the_organizer_copy_id() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <m:CreateItemResponse xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
      <m:ResponseMessages>
        <m:CreateItemResponseMessage ResponseClass="Success">
          <m:ResponseCode>NoError</m:ResponseCode>
          <m:Items>
            <t:CalendarItem>
              <t:ItemId Id="new-item" ChangeKey="new-ck" />
            </t:CalendarItem>
          </m:Items>
        </m:CreateItemResponseMessage>
      </m:ResponseMessages>
    </m:CreateItemResponse>
  </s:Body>
</s:Envelope>"#;
        let outcome = parse_create_item(xml).unwrap();
        assert_eq!(outcome.response_class, "Success");
        assert_eq!(
            outcome.item_id,
            Some(("new-item".to_string(), "new-ck".to_string()))
        );
    }

    #[test]
    fn find_item_collects_every_match() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <m:FindItemResponse xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
      <m:ResponseMessages>
        <m:FindItemResponseMessage ResponseClass="Success">
          <m:ResponseCode>NoError</m:ResponseCode>
          <m:RootFolder TotalItemsInView="1" IncludesLastItemInRange="true">
            <t:Items>
              <t:CalendarItem>
                <t:ItemId Id="found-1" ChangeKey="fk-1" />
              </t:CalendarItem>
            </t:Items>
          </m:RootFolder>
        </m:FindItemResponseMessage>
      </m:ResponseMessages>
    </m:FindItemResponse>
  </s:Body>
</s:Envelope>"#;
        let found = parse_find_item(xml).unwrap();
        assert_eq!(found, vec![("found-1".to_string(), "fk-1".to_string())]);
        assert!(parse_find_item(FAULT).unwrap().is_empty());
    }

    #[test]
    fn get_rooms_reads_the_room_list() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <m:GetRoomsResponse ResponseClass="Success" xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
      <m:ResponseCode>NoError</m:ResponseCode>
      <m:Rooms>
        <t:Room>
          <t:Id>
            <t:Name>Room A</t:Name>
            <t:EmailAddress>a@x.test</t:EmailAddress>
            <t:RoutingType>SMTP</t:RoutingType>
            <t:MailboxType>Mailbox</t:MailboxType>
          </t:Id>
        </t:Room>
        <t:Room>
          <t:Id>
            <t:Name>Room B</t:Name>
            <t:EmailAddress>b@x.test</t:EmailAddress>
          </t:Id>
        </t:Room>
      </m:Rooms>
    </m:GetRoomsResponse>
  </s:Body>
</s:Envelope>"#;
        let rooms = parse_get_rooms(xml).unwrap();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].email, "a@x.test");
        assert_eq!(rooms[0].name, "Room A");
        assert_eq!(rooms[1].email, "b@x.test");
    }

    #[test]
    fn resolve_names_reads_mailbox_addresses_only() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <m:ResolveNamesResponse xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
      <m:ResponseMessages>
        <m:ResolveNamesResponseMessage ResponseClass="Success">
          <m:ResponseCode>NoError</m:ResponseCode>
          <m:ResolutionSet TotalItemsInView="1" IncludesLastItemInRange="true">
            <t:Resolution>
              <t:Mailbox>
                <t:Name>Bob</t:Name>
                <t:EmailAddress>bob@x.test</t:EmailAddress>
              </t:Mailbox>
              <t:Contact>
                <t:EmailAddresses>
                  <t:Entry Key="EmailAddress1">smtp:bob@x.test</t:Entry>
                </t:EmailAddresses>
              </t:Contact>
            </t:Resolution>
          </m:ResolutionSet>
        </m:ResolveNamesResponseMessage>
      </m:ResponseMessages>
    </m:ResolveNamesResponse>
  </s:Body>
</s:Envelope>"#;
        let addresses = parse_resolve_names(xml).unwrap();
        assert_eq!(addresses, vec!["bob@x.test".to_string()]);
    }

    #[test]
    fn response_status_is_operation_agnostic() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <m:DeleteItemResponse xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages">
      <m:ResponseMessages>
        <m:DeleteItemResponseMessage ResponseClass="Success">
          <m:ResponseCode>NoError</m:ResponseCode>
        </m:DeleteItemResponseMessage>
      </m:ResponseMessages>
    </m:DeleteItemResponse>
  </s:Body>
</s:Envelope>"#;
        let status = parse_response_status(xml).unwrap();
        assert!(status.is_success());
    }
}
