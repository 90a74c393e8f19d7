//! SOAP request bodies.
//!
//! Requests target `Exchange2013_SP1`. Impersonation uses
//! `PrincipalName` for service-user operations and `SmtpAddress` for
//! per-mailbox operations. All interpolated values are XML-escaped.

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;

use crate::uid::{GLOBAL_OBJECT_ID_PROPERTY_ID, GLOBAL_OBJECT_ID_PROPERTY_SET};

/// Maximum changes requested per `SyncFolderItems` call. The response
/// carries `IncludesLastItemInRange`; callers loop until it is true.
pub(crate) const MAX_CHANGES_RETURNED: u32 = 256;

const CALENDAR_FIELDS: &str = r#"<t:FieldURI FieldURI="calendar:UID"/>
                    <t:FieldURI FieldURI="item:Subject"/>
                    <t:FieldURI FieldURI="item:DateTimeReceived"/>
                    <t:FieldURI FieldURI="calendar:Start"/>
                    <t:FieldURI FieldURI="calendar:End"/>
                    <t:FieldURI FieldURI="calendar:Organizer"/>
                    <t:FieldURI FieldURI="calendar:CalendarItemType"/>"#;

fn header_principal(principal: &str) -> String {
    format!(
        r#"<soap:Header>
        <t:RequestServerVersion Version="Exchange2013_SP1"/>
        <t:ExchangeImpersonation>
            <t:ConnectingSID>
                <t:PrincipalName>{}</t:PrincipalName>
            </t:ConnectingSID>
        </t:ExchangeImpersonation>
    </soap:Header>"#,
        escape(principal)
    )
}

fn header_smtp(mailbox: &str) -> String {
    format!(
        r#"<soap:Header>
        <t:RequestServerVersion Version="Exchange2013_SP1"/>
        <t:ExchangeImpersonation>
            <t:ConnectingSID>
                <t:SmtpAddress>{}</t:SmtpAddress>
            </t:ConnectingSID>
        </t:ExchangeImpersonation>
    </soap:Header>"#,
        escape(mailbox)
    )
}

fn wrap(header: &str, body: &str) -> String {
    format!(
        r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types" xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages">
    {header}
    <soap:Body>
        {body}
    </soap:Body>
</soap:Envelope>"#
    )
}

fn rfc3339(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `GetRooms` on a room list, as the service user.
pub(crate) fn get_rooms(service_user: &str, room_list_upn: &str) -> String {
    let body = format!(
        r"<m:GetRooms>
            <m:RoomList>
                <t:EmailAddress>{}</t:EmailAddress>
            </m:RoomList>
        </m:GetRooms>",
        escape(room_list_upn)
    );
    wrap(&header_principal(service_user), &body)
}

/// `SyncFolderItems` on a room's calendar folder. An empty sync state
/// starts the stream from the beginning of the folder's history.
pub(crate) fn sync_folder_items(room_mailbox: &str, sync_state: &str) -> String {
    let body = format!(
        r#"<m:SyncFolderItems>
            <m:ItemShape>
                <t:BaseShape>IdOnly</t:BaseShape>
                <t:AdditionalProperties>
                    {CALENDAR_FIELDS}
                </t:AdditionalProperties>
            </m:ItemShape>
            <m:SyncFolderId>
                <t:DistinguishedFolderId Id="calendar">
                    <t:Mailbox>
                        <t:EmailAddress>{}</t:EmailAddress>
                    </t:Mailbox>
                </t:DistinguishedFolderId>
            </m:SyncFolderId>
            <m:SyncState>{}</m:SyncState>
            <m:MaxChangesReturned>{MAX_CHANGES_RETURNED}</m:MaxChangesReturned>
        </m:SyncFolderItems>"#,
        escape(room_mailbox),
        escape(sync_state),
    );
    wrap(&header_smtp(room_mailbox), &body)
}

/// `GetItem` on one occurrence of a recurring master.
pub(crate) fn get_occurrence(room_mailbox: &str, master_id: &str, instance_index: i32) -> String {
    let body = format!(
        r#"<m:GetItem>
            <m:ItemShape>
                <t:BaseShape>IdOnly</t:BaseShape>
                <t:AdditionalProperties>
                    {CALENDAR_FIELDS}
                </t:AdditionalProperties>
            </m:ItemShape>
            <m:ItemIds>
                <t:OccurrenceItemId RecurringMasterId="{}" InstanceIndex="{instance_index}" />
            </m:ItemIds>
        </m:GetItem>"#,
        escape(master_id),
    );
    wrap(&header_smtp(room_mailbox), &body)
}

/// `GetItem` fetching only the calendar UID of one item.
pub(crate) fn get_uid(mailbox: &str, item_id: &str) -> String {
    let body = format!(
        r#"<m:GetItem>
            <m:ItemShape>
                <t:BaseShape>IdOnly</t:BaseShape>
                <t:AdditionalProperties>
                    <t:FieldURI FieldURI="calendar:UID"/>
                </t:AdditionalProperties>
            </m:ItemShape>
            <m:ItemIds>
                <t:ItemId Id="{}"/>
            </m:ItemIds>
        </m:GetItem>"#,
        escape(item_id),
    );
    wrap(&header_smtp(mailbox), &body)
}

/// `CreateItem` sending invitations to every attendee.
pub(crate) fn create_appointment(
    organizer: &str,
    subject: &str,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
    location: &str,
    attendees: &[String],
) -> String {
    let mut attendee_xml = String::new();
    for email in attendees {
        attendee_xml.push_str(&format!(
            r"
                        <t:Attendee>
                            <t:Mailbox>
                                <t:EmailAddress>{}</t:EmailAddress>
                            </t:Mailbox>
                        </t:Attendee>",
            escape(email.as_str())
        ));
    }
    let body = format!(
        r#"<m:CreateItem SendMeetingInvitations="SendToAllAndSaveCopy">
            <m:SavedItemFolderId>
                <t:DistinguishedFolderId Id="calendar"/>
            </m:SavedItemFolderId>
            <m:Items>
                <t:CalendarItem>
                    <t:Subject>{}</t:Subject>
                    <t:Start>{}</t:Start>
                    <t:End>{}</t:End>
                    <t:IsAllDayEvent>false</t:IsAllDayEvent>
                    <t:LegacyFreeBusyStatus>Busy</t:LegacyFreeBusyStatus>
                    <t:Location>{}</t:Location>
                    <t:RequiredAttendees>{attendee_xml}
                    </t:RequiredAttendees>
                </t:CalendarItem>
            </m:Items>
        </m:CreateItem>"#,
        escape(subject),
        rfc3339(start),
        rfc3339(end),
        escape(location),
    );
    wrap(&header_smtp(organizer), &body)
}

/// `CancelCalendarItem` on the organizer's copy of an event.
pub(crate) fn cancel_event(organizer: &str, item_id: &str, change_key: &str) -> String {
    let body = format!(
        r#"<m:CreateItem MessageDisposition="SendAndSaveCopy">
            <m:Items>
                <t:CancelCalendarItem>
                    <t:ReferenceItemId Id="{}" ChangeKey="{}" />
                    <t:NewBodyContent BodyType="HTML">Cancelled via roomsync</t:NewBodyContent>
                </t:CancelCalendarItem>
            </m:Items>
        </m:CreateItem>"#,
        escape(item_id),
        escape(change_key),
    );
    wrap(&header_smtp(organizer), &body)
}

/// `DeleteItem` on one occurrence of a recurring series.
pub(crate) fn delete_occurrence(organizer: &str, master_id: &str, instance_index: i32) -> String {
    let body = format!(
        r#"<m:DeleteItem DeleteType="MoveToDeletedItems" SendMeetingCancellations="SendToAllAndSaveCopy">
            <m:ItemIds>
                <t:OccurrenceItemId RecurringMasterId="{}" InstanceIndex="{instance_index}" />
            </m:ItemIds>
        </m:DeleteItem>"#,
        escape(master_id),
    );
    wrap(&header_smtp(organizer), &body)
}

/// `FindItem` restricted on the GlobalObjectId extended property.
pub(crate) fn find_by_global_object_id(mailbox: &str, global_object_id: &str) -> String {
    let body = format!(
        r#"<m:FindItem Traversal="Shallow">
            <m:ItemShape>
                <t:BaseShape>AllProperties</t:BaseShape>
            </m:ItemShape>
            <m:Restriction>
                <t:IsEqualTo>
                    <t:ExtendedFieldURI PropertySetId="{GLOBAL_OBJECT_ID_PROPERTY_SET}" PropertyId="{GLOBAL_OBJECT_ID_PROPERTY_ID}" PropertyType="Binary"/>
                    <t:FieldURIOrConstant>
                        <t:Constant Value="{}"/>
                    </t:FieldURIOrConstant>
                </t:IsEqualTo>
            </m:Restriction>
            <m:ParentFolderIds>
                <t:DistinguishedFolderId Id="calendar">
                    <t:Mailbox>
                        <t:EmailAddress>{}</t:EmailAddress>
                    </t:Mailbox>
                </t:DistinguishedFolderId>
            </m:ParentFolderIds>
        </m:FindItem>"#,
        escape(global_object_id),
        escape(mailbox),
    );
    wrap(&header_smtp(mailbox), &body)
}

/// `ResolveNames` against Active Directory, as the service user.
pub(crate) fn resolve_names(service_user: &str, name: &str) -> String {
    let body = format!(
        r#"<m:ResolveNames ReturnFullContactData="true" SearchScope="ActiveDirectory">
            <m:UnresolvedEntry>{}</m:UnresolvedEntry>
        </m:ResolveNames>"#,
        escape(name),
    );
    wrap(&header_principal(service_user), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn get_rooms_impersonates_the_service_user() {
        let xml = get_rooms("svc@x.test", "first.floor@x.test");
        assert!(xml.contains("<t:PrincipalName>svc@x.test</t:PrincipalName>"));
        assert!(xml.contains("<t:EmailAddress>first.floor@x.test</t:EmailAddress>"));
        assert!(xml.contains(r#"Version="Exchange2013_SP1""#));
    }

    #[test]
    fn sync_impersonates_the_room_and_bounds_the_page() {
        let xml = sync_folder_items("a@x.test", "cookie==");
        assert!(xml.contains("<t:SmtpAddress>a@x.test</t:SmtpAddress>"));
        assert!(xml.contains("<m:SyncState>cookie==</m:SyncState>"));
        assert!(xml.contains("<m:MaxChangesReturned>256</m:MaxChangesReturned>"));
    }

    #[test]
    fn occurrence_request_carries_the_instance_index() {
        let xml = get_occurrence("a@x.test", "master-id", 3);
        assert!(xml.contains(r#"<t:OccurrenceItemId RecurringMasterId="master-id" InstanceIndex="3" />"#));
    }

    #[test]
    fn create_sends_invitations_and_formats_timestamps() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap();
        let xml = create_appointment(
            "alice@x.test",
            "Standup",
            &start,
            &end,
            "a@x.test",
            &["a@x.test".to_string(), "b@x.test".to_string()],
        );
        assert!(xml.contains(r#"SendMeetingInvitations="SendToAllAndSaveCopy""#));
        assert!(xml.contains("<t:Start>2024-01-02T10:00:00Z</t:Start>"));
        assert_eq!(xml.matches("<t:Attendee>").count(), 2);
    }

    #[test]
    fn find_request_uses_the_meeting_property_set() {
        let xml = find_by_global_object_id("a@x.test", "BACL");
        assert!(xml.contains(r#"PropertySetId="6ED8DA90-450B-101B-98DA-00AA003F1305""#));
        assert!(xml.contains(r#"PropertyId="3""#));
        assert!(xml.contains(r#"<t:Constant Value="BACL"/>"#));
    }

    #[test]
    fn interpolated_values_are_escaped() {
        let xml = resolve_names("svc@x.test", "Smith & Jones <legacy>");
        assert!(xml.contains("Smith &amp; Jones &lt;legacy&gt;"));
    }

    #[test]
    fn delete_moves_to_deleted_items_and_notifies() {
        let xml = delete_occurrence("alice@x.test", "master-id", 2);
        assert!(xml.contains(r#"DeleteType="MoveToDeletedItems""#));
        assert!(xml.contains(r#"SendMeetingCancellations="SendToAllAndSaveCopy""#));
    }
}
