//! Well-known OData v4 field names and formats used by the Web API

/// JSON field carrying the concurrency token on every persisted entity.
pub const ETAG_FIELD: &str = "@odata.etag";

/// JSON field carrying the server-provided resource context path.
pub const CONTEXT_FIELD: &str = "@odata.context";

/// Suffix marking a media read link, e.g. `picture@odata.mediaReadLink`.
pub const MEDIA_READ_LINK_SUFFIX: &str = "@odata.mediaReadLink";

/// Suffix marking a media edit link, e.g. `picture@odata.mediaEditLink`.
pub const MEDIA_EDIT_LINK_SUFFIX: &str = "@odata.mediaEditLink";

/// All-zero GUID, treated as logically null by typed accessors.
pub const ZERO_GUID: &str = "00000000-0000-0000-0000-000000000000";

/// Wire format for date-time values, millisecond precision, UTC.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Wire format for date-only values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Relative path of the batch endpoint.
pub const BATCH_ENDPOINT: &str = "$batch";
