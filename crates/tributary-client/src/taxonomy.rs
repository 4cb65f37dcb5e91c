//! Broker and client error codes
//!
//! The table mirrors the code space published by the broker protocol and the
//! reference client library: negative codes in `-199..=-137` are raised
//! locally by the client engine (their names carry a leading underscore),
//! codes from `-1` upwards are returned by brokers. Application code written
//! against `(code, name)` pairs therefore stays portable.
//!
//! ```rust
//! use tributary_client::taxonomy::{self, ErrorCode};
//!
//! let entry = taxonomy::lookup(ErrorCode::QUEUE_FULL);
//! assert_eq!(entry.name, "_QUEUE_FULL");
//! assert_eq!(entry.message, "Local: Queue full");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single row of the error table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorEntry {
    pub code: i32,
    pub name: &'static str,
    pub message: &'static str,
}

/// Returned by [`lookup`] for codes missing from the table
pub const UNKNOWN_ENTRY: ErrorEntry = ErrorEntry {
    code: i32::MIN,
    name: "UNKNOWN_CODE",
    message: "Unknown error code",
};

/// Error code reported by the engine or a broker; the default is `NO_ERROR`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    pub const BAD_MSG: ErrorCode = ErrorCode(-199);
    pub const BAD_COMPRESSION: ErrorCode = ErrorCode(-198);
    pub const DESTROY: ErrorCode = ErrorCode(-197);
    pub const FAIL: ErrorCode = ErrorCode(-196);
    pub const TRANSPORT: ErrorCode = ErrorCode(-195);
    pub const RESOLVE: ErrorCode = ErrorCode(-193);
    pub const MSG_TIMED_OUT: ErrorCode = ErrorCode(-192);
    pub const PARTITION_EOF: ErrorCode = ErrorCode(-191);
    pub const UNKNOWN_PARTITION: ErrorCode = ErrorCode(-190);
    pub const UNKNOWN_TOPIC: ErrorCode = ErrorCode(-188);
    pub const ALL_BROKERS_DOWN: ErrorCode = ErrorCode(-187);
    pub const INVALID_ARG: ErrorCode = ErrorCode(-186);
    pub const TIMED_OUT: ErrorCode = ErrorCode(-185);
    pub const QUEUE_FULL: ErrorCode = ErrorCode(-184);
    pub const SSL: ErrorCode = ErrorCode(-181);
    pub const WAIT_COORD: ErrorCode = ErrorCode(-180);
    pub const IN_PROGRESS: ErrorCode = ErrorCode(-178);
    pub const PREV_IN_PROGRESS: ErrorCode = ErrorCode(-177);
    pub const ASSIGN_PARTITIONS: ErrorCode = ErrorCode(-175);
    pub const REVOKE_PARTITIONS: ErrorCode = ErrorCode(-174);
    pub const STATE: ErrorCode = ErrorCode(-172);
    pub const UNKNOWN_PROTOCOL: ErrorCode = ErrorCode(-171);
    pub const AUTHENTICATION: ErrorCode = ErrorCode(-169);
    pub const NO_OFFSET: ErrorCode = ErrorCode(-168);
    pub const FATAL: ErrorCode = ErrorCode(-150);
    pub const FENCED: ErrorCode = ErrorCode(-144);
    pub const ASSIGNMENT_LOST: ErrorCode = ErrorCode(-142);
    pub const LOG_TRUNCATION: ErrorCode = ErrorCode(-139);

    pub const UNKNOWN: ErrorCode = ErrorCode(-1);
    pub const NO_ERROR: ErrorCode = ErrorCode(0);
    pub const OFFSET_OUT_OF_RANGE: ErrorCode = ErrorCode(1);
    pub const UNKNOWN_TOPIC_OR_PART: ErrorCode = ErrorCode(3);
    pub const LEADER_NOT_AVAILABLE: ErrorCode = ErrorCode(5);
    pub const NOT_LEADER_FOR_PARTITION: ErrorCode = ErrorCode(6);
    pub const REQUEST_TIMED_OUT: ErrorCode = ErrorCode(7);
    pub const BROKER_NOT_AVAILABLE: ErrorCode = ErrorCode(8);
    pub const MSG_SIZE_TOO_LARGE: ErrorCode = ErrorCode(10);
    pub const COORDINATOR_NOT_AVAILABLE: ErrorCode = ErrorCode(15);
    pub const NOT_COORDINATOR: ErrorCode = ErrorCode(16);
    pub const ILLEGAL_GENERATION: ErrorCode = ErrorCode(22);
    pub const UNKNOWN_MEMBER_ID: ErrorCode = ErrorCode(25);
    pub const REBALANCE_IN_PROGRESS: ErrorCode = ErrorCode(27);
    pub const TOPIC_AUTHORIZATION_FAILED: ErrorCode = ErrorCode(29);
    pub const GROUP_AUTHORIZATION_FAILED: ErrorCode = ErrorCode(30);
    pub const CLUSTER_AUTHORIZATION_FAILED: ErrorCode = ErrorCode(31);
    pub const SASL_AUTHENTICATION_FAILED: ErrorCode = ErrorCode(58);
    pub const MEMBER_ID_REQUIRED: ErrorCode = ErrorCode(79);
    pub const FENCED_INSTANCE_ID: ErrorCode = ErrorCode(82);
    pub const UNSTABLE_OFFSET_COMMIT: ErrorCode = ErrorCode(88);

    pub fn code(self) -> i32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self == ErrorCode::NO_ERROR
    }

    /// Codes after which the client cannot continue on its current connection
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorCode::FATAL
                | ErrorCode::DESTROY
                | ErrorCode::ALL_BROKERS_DOWN
                | ErrorCode::AUTHENTICATION
                | ErrorCode::SSL
                | ErrorCode::UNKNOWN_PROTOCOL
                | ErrorCode::FENCED
                | ErrorCode::TOPIC_AUTHORIZATION_FAILED
                | ErrorCode::GROUP_AUTHORIZATION_FAILED
                | ErrorCode::CLUSTER_AUTHORIZATION_FAILED
                | ErrorCode::SASL_AUTHENTICATION_FAILED
        )
    }

    pub fn name(self) -> &'static str {
        lookup(self).name
    }

    pub fn message(self) -> &'static str {
        lookup(self).message
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        ErrorCode(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

/// Look up the symbolic name and message for a code.
///
/// Never fails: unknown codes resolve to [`UNKNOWN_ENTRY`].
pub fn lookup(code: ErrorCode) -> &'static ErrorEntry {
    ENTRIES
        .binary_search_by_key(&code.0, |entry| entry.code)
        .map(|idx| &ENTRIES[idx])
        .unwrap_or(&UNKNOWN_ENTRY)
}

/// Reverse lookup by symbolic name
pub fn by_name(name: &str) -> Option<&'static ErrorEntry> {
    ENTRIES.iter().find(|entry| entry.name == name)
}

/// The whole table, ordered by code
pub fn entries() -> impl Iterator<Item = &'static ErrorEntry> {
    ENTRIES.iter()
}

macro_rules! entry {
    ($code:expr, $name:expr, $message:expr) => {
        ErrorEntry {
            code: $code,
            name: $name,
            message: $message,
        }
    };
}

// Must stay sorted by code: lookup() binary-searches it.
static ENTRIES: &[ErrorEntry] = &[
    entry!(-199, "_BAD_MSG", "Local: Bad message format"),
    entry!(-198, "_BAD_COMPRESSION", "Local: Invalid compressed data"),
    entry!(-197, "_DESTROY", "Local: Broker handle destroyed"),
    entry!(-196, "_FAIL", "Local: Communication failure with broker"),
    entry!(-195, "_TRANSPORT", "Local: Broker transport failure"),
    entry!(-194, "_CRIT_SYS_RESOURCE", "Local: Critical system resource failure"),
    entry!(-193, "_RESOLVE", "Local: Host resolution failure"),
    entry!(-192, "_MSG_TIMED_OUT", "Local: Message timed out"),
    entry!(-191, "_PARTITION_EOF", "Broker: No more messages"),
    entry!(-190, "_UNKNOWN_PARTITION", "Local: Unknown partition"),
    entry!(-189, "_FS", "Local: File or filesystem error"),
    entry!(-188, "_UNKNOWN_TOPIC", "Local: Unknown topic"),
    entry!(-187, "_ALL_BROKERS_DOWN", "Local: All broker connections are down"),
    entry!(-186, "_INVALID_ARG", "Local: Invalid argument or configuration"),
    entry!(-185, "_TIMED_OUT", "Local: Timed out"),
    entry!(-184, "_QUEUE_FULL", "Local: Queue full"),
    entry!(-183, "_ISR_INSUFF", "Local: ISR count insufficient"),
    entry!(-182, "_NODE_UPDATE", "Local: Broker node update"),
    entry!(-181, "_SSL", "Local: SSL error"),
    entry!(-180, "_WAIT_COORD", "Local: Waiting for coordinator"),
    entry!(-179, "_UNKNOWN_GROUP", "Local: Unknown group"),
    entry!(-178, "_IN_PROGRESS", "Local: Operation in progress"),
    entry!(-177, "_PREV_IN_PROGRESS", "Local: Previous operation in progress"),
    entry!(-176, "_EXISTING_SUBSCRIPTION", "Local: Existing subscription"),
    entry!(-175, "_ASSIGN_PARTITIONS", "Local: Assign partitions"),
    entry!(-174, "_REVOKE_PARTITIONS", "Local: Revoke partitions"),
    entry!(-173, "_CONFLICT", "Local: Conflicting use"),
    entry!(-172, "_STATE", "Local: Erroneous state"),
    entry!(-171, "_UNKNOWN_PROTOCOL", "Local: Unknown protocol"),
    entry!(-170, "_NOT_IMPLEMENTED", "Local: Not implemented"),
    entry!(-169, "_AUTHENTICATION", "Local: Authentication failure"),
    entry!(-168, "_NO_OFFSET", "Local: No offset stored"),
    entry!(-167, "_OUTDATED", "Local: Outdated"),
    entry!(-166, "_TIMED_OUT_QUEUE", "Local: Timed out in queue"),
    entry!(-165, "_UNSUPPORTED_FEATURE", "Local: Required feature not supported by broker"),
    entry!(-164, "_WAIT_CACHE", "Local: Awaiting cache update"),
    entry!(-163, "_INTR", "Local: Operation interrupted"),
    entry!(-162, "_KEY_SERIALIZATION", "Local: Key serialization error"),
    entry!(-161, "_VALUE_SERIALIZATION", "Local: Value serialization error"),
    entry!(-160, "_KEY_DESERIALIZATION", "Local: Key deserialization error"),
    entry!(-159, "_VALUE_DESERIALIZATION", "Local: Value deserialization error"),
    entry!(-158, "_PARTIAL", "Local: Partial response"),
    entry!(-157, "_READ_ONLY", "Local: Read-only object"),
    entry!(-156, "_NOENT", "Local: No such entry"),
    entry!(-155, "_UNDERFLOW", "Local: Read underflow"),
    entry!(-154, "_INVALID_TYPE", "Local: Invalid type"),
    entry!(-153, "_RETRY", "Local: Retry operation"),
    entry!(-152, "_PURGE_QUEUE", "Local: Purged in queue"),
    entry!(-151, "_PURGE_INFLIGHT", "Local: Purged in flight"),
    entry!(-150, "_FATAL", "Local: Fatal error"),
    entry!(-149, "_INCONSISTENT", "Local: Inconsistent state"),
    entry!(-148, "_GAPLESS_GUARANTEE", "Local: Gap-less ordering would not be guaranteed if proceeding"),
    entry!(-147, "_MAX_POLL_EXCEEDED", "Local: Maximum application poll interval (max.poll.interval.ms) exceeded"),
    entry!(-146, "_UNKNOWN_BROKER", "Local: Unknown broker"),
    entry!(-145, "_NOT_CONFIGURED", "Local: Functionality not configured"),
    entry!(-144, "_FENCED", "Local: This instance has been fenced by a newer instance"),
    entry!(-143, "_APPLICATION", "Local: Application generated error"),
    entry!(-142, "_ASSIGNMENT_LOST", "Local: Group partition assignment lost"),
    entry!(-141, "_NOOP", "Local: No operation performed"),
    entry!(-140, "_AUTO_OFFSET_RESET", "Local: No offset to automatically reset to"),
    entry!(-139, "_LOG_TRUNCATION", "Local: Partition log truncation detected"),
    entry!(-138, "_INVALID_DIFFERENT_RECORD", "Local: an invalid record in the same batch caused the failure of this message too"),
    entry!(-137, "_DESTROY_BROKER", "Local: Broker handle destroyed without termination"),
    entry!(-1, "UNKNOWN", "Unknown broker error"),
    entry!(0, "NO_ERROR", "Success"),
    entry!(1, "OFFSET_OUT_OF_RANGE", "Broker: Offset out of range"),
    entry!(2, "INVALID_MSG", "Broker: Invalid message"),
    entry!(3, "UNKNOWN_TOPIC_OR_PART", "Broker: Unknown topic or partition"),
    entry!(4, "INVALID_MSG_SIZE", "Broker: Invalid message size"),
    entry!(5, "LEADER_NOT_AVAILABLE", "Broker: Leader not available"),
    entry!(6, "NOT_LEADER_FOR_PARTITION", "Broker: Not leader for partition"),
    entry!(7, "REQUEST_TIMED_OUT", "Broker: Request timed out"),
    entry!(8, "BROKER_NOT_AVAILABLE", "Broker: Broker not available"),
    entry!(9, "REPLICA_NOT_AVAILABLE", "Broker: Replica not available"),
    entry!(10, "MSG_SIZE_TOO_LARGE", "Broker: Message size too large"),
    entry!(11, "STALE_CTRL_EPOCH", "Broker: StaleControllerEpochCode"),
    entry!(12, "OFFSET_METADATA_TOO_LARGE", "Broker: Offset metadata string too large"),
    entry!(13, "NETWORK_EXCEPTION", "Broker: Broker disconnected before response received"),
    entry!(14, "COORDINATOR_LOAD_IN_PROGRESS", "Broker: Coordinator load in progress"),
    entry!(15, "COORDINATOR_NOT_AVAILABLE", "Broker: Coordinator not available"),
    entry!(16, "NOT_COORDINATOR", "Broker: Not coordinator"),
    entry!(17, "TOPIC_EXCEPTION", "Broker: Invalid topic"),
    entry!(18, "RECORD_LIST_TOO_LARGE", "Broker: Message batch larger than configured server segment size"),
    entry!(19, "NOT_ENOUGH_REPLICAS", "Broker: Not enough in-sync replicas"),
    entry!(20, "NOT_ENOUGH_REPLICAS_AFTER_APPEND", "Broker: Message(s) written to insufficient number of in-sync replicas"),
    entry!(21, "INVALID_REQUIRED_ACKS", "Broker: Invalid required acks value"),
    entry!(22, "ILLEGAL_GENERATION", "Broker: Specified group generation id is not valid"),
    entry!(23, "INCONSISTENT_GROUP_PROTOCOL", "Broker: Inconsistent group protocol"),
    entry!(24, "INVALID_GROUP_ID", "Broker: Invalid group.id"),
    entry!(25, "UNKNOWN_MEMBER_ID", "Broker: Unknown member"),
    entry!(26, "INVALID_SESSION_TIMEOUT", "Broker: Invalid session timeout"),
    entry!(27, "REBALANCE_IN_PROGRESS", "Broker: Group rebalance in progress"),
    entry!(28, "INVALID_COMMIT_OFFSET_SIZE", "Broker: Commit offset data size is not valid"),
    entry!(29, "TOPIC_AUTHORIZATION_FAILED", "Broker: Topic authorization failed"),
    entry!(30, "GROUP_AUTHORIZATION_FAILED", "Broker: Group authorization failed"),
    entry!(31, "CLUSTER_AUTHORIZATION_FAILED", "Broker: Cluster authorization failed"),
    entry!(32, "INVALID_TIMESTAMP", "Broker: Invalid timestamp"),
    entry!(33, "UNSUPPORTED_SASL_MECHANISM", "Broker: Unsupported SASL mechanism"),
    entry!(34, "ILLEGAL_SASL_STATE", "Broker: Request not valid in current SASL state"),
    entry!(35, "UNSUPPORTED_VERSION", "Broker: API version not supported"),
    entry!(36, "TOPIC_ALREADY_EXISTS", "Broker: Topic already exists"),
    entry!(37, "INVALID_PARTITIONS", "Broker: Invalid number of partitions"),
    entry!(38, "INVALID_REPLICATION_FACTOR", "Broker: Invalid replication factor"),
    entry!(39, "INVALID_REPLICA_ASSIGNMENT", "Broker: Invalid replica assignment"),
    entry!(40, "INVALID_CONFIG", "Broker: Configuration is invalid"),
    entry!(41, "NOT_CONTROLLER", "Broker: Not controller for cluster"),
    entry!(42, "INVALID_REQUEST", "Broker: Invalid request"),
    entry!(43, "UNSUPPORTED_FOR_MESSAGE_FORMAT", "Broker: Message format on broker does not support request"),
    entry!(44, "POLICY_VIOLATION", "Broker: Policy violation"),
    entry!(45, "OUT_OF_ORDER_SEQUENCE_NUMBER", "Broker: Broker received an out of order sequence number"),
    entry!(46, "DUPLICATE_SEQUENCE_NUMBER", "Broker: Broker received a duplicate sequence number"),
    entry!(47, "INVALID_PRODUCER_EPOCH", "Broker: Producer attempted an operation with an old epoch"),
    entry!(48, "INVALID_TXN_STATE", "Broker: Producer attempted a transactional operation in an invalid state"),
    entry!(49, "INVALID_PRODUCER_ID_MAPPING", "Broker: Producer attempted to use a producer id which is not currently assigned to its transactional id"),
    entry!(50, "INVALID_TRANSACTION_TIMEOUT", "Broker: Transaction timeout is larger than the maximum value allowed by the broker's max.transaction.timeout.ms"),
    entry!(51, "CONCURRENT_TRANSACTIONS", "Broker: Producer attempted to update a transaction while another concurrent operation on the same transaction was ongoing"),
    entry!(52, "TRANSACTION_COORDINATOR_FENCED", "Broker: Indicates that the transaction coordinator sending a WriteTxnMarker is no longer the current coordinator for a given producer"),
    entry!(53, "TRANSACTIONAL_ID_AUTHORIZATION_FAILED", "Broker: Transactional Id authorization failed"),
    entry!(54, "SECURITY_DISABLED", "Broker: Security features are disabled"),
    entry!(55, "OPERATION_NOT_ATTEMPTED", "Broker: Operation not attempted"),
    entry!(56, "KAFKA_STORAGE_ERROR", "Broker: Disk error when trying to access log file on disk"),
    entry!(57, "LOG_DIR_NOT_FOUND", "Broker: The user-specified log directory is not found in the broker config"),
    entry!(58, "SASL_AUTHENTICATION_FAILED", "Broker: SASL Authentication failed"),
    entry!(59, "UNKNOWN_PRODUCER_ID", "Broker: Unknown Producer Id"),
    entry!(60, "REASSIGNMENT_IN_PROGRESS", "Broker: Partition reassignment is in progress"),
    entry!(61, "DELEGATION_TOKEN_AUTH_DISABLED", "Broker: Delegation Token feature is not enabled"),
    entry!(62, "DELEGATION_TOKEN_NOT_FOUND", "Broker: Delegation Token is not found on server"),
    entry!(63, "DELEGATION_TOKEN_OWNER_MISMATCH", "Broker: Specified Principal is not valid Owner/Renewer"),
    entry!(64, "DELEGATION_TOKEN_REQUEST_NOT_ALLOWED", "Broker: Delegation Token requests are not allowed on this connection"),
    entry!(65, "DELEGATION_TOKEN_AUTHORIZATION_FAILED", "Broker: Delegation Token authorization failed"),
    entry!(66, "DELEGATION_TOKEN_EXPIRED", "Broker: Delegation Token is expired"),
    entry!(67, "INVALID_PRINCIPAL_TYPE", "Broker: Supplied principalType is not supported"),
    entry!(68, "NON_EMPTY_GROUP", "Broker: The group is not empty"),
    entry!(69, "GROUP_ID_NOT_FOUND", "Broker: The group id does not exist"),
    entry!(70, "FETCH_SESSION_ID_NOT_FOUND", "Broker: The fetch session ID was not found"),
    entry!(71, "INVALID_FETCH_SESSION_EPOCH", "Broker: The fetch session epoch is invalid"),
    entry!(72, "LISTENER_NOT_FOUND", "Broker: No matching listener"),
    entry!(73, "TOPIC_DELETION_DISABLED", "Broker: Topic deletion is disabled"),
    entry!(74, "FENCED_LEADER_EPOCH", "Broker: Leader epoch is older than broker epoch"),
    entry!(75, "UNKNOWN_LEADER_EPOCH", "Broker: Leader epoch is newer than broker epoch"),
    entry!(76, "UNSUPPORTED_COMPRESSION_TYPE", "Broker: Unsupported compression type"),
    entry!(77, "STALE_BROKER_EPOCH", "Broker: Broker epoch has changed"),
    entry!(78, "OFFSET_NOT_AVAILABLE", "Broker: Leader high watermark is not caught up"),
    entry!(79, "MEMBER_ID_REQUIRED", "Broker: Group member needs a valid member ID"),
    entry!(80, "PREFERRED_LEADER_NOT_AVAILABLE", "Broker: Preferred leader was not available"),
    entry!(81, "GROUP_MAX_SIZE_REACHED", "Broker: Consumer group has reached maximum size"),
    entry!(82, "FENCED_INSTANCE_ID", "Broker: Static consumer fenced by other consumer with same group.instance.id"),
    entry!(83, "ELIGIBLE_LEADERS_NOT_AVAILABLE", "Broker: Eligible partition leaders are not available"),
    entry!(84, "ELECTION_NOT_NEEDED", "Broker: Leader election not needed for topic partition"),
    entry!(85, "NO_REASSIGNMENT_IN_PROGRESS", "Broker: No partition reassignment is in progress"),
    entry!(86, "GROUP_SUBSCRIBED_TO_TOPIC", "Broker: Deleting offsets of a topic while the consumer group is subscribed to it"),
    entry!(87, "INVALID_RECORD", "Broker: Broker failed to validate record"),
    entry!(88, "UNSTABLE_OFFSET_COMMIT", "Broker: There are unstable offsets that need to be cleared"),
    entry!(89, "THROTTLING_QUOTA_EXCEEDED", "Broker: Throttling quota has been exceeded"),
    entry!(90, "PRODUCER_FENCED", "Broker: There is a newer producer with the same transactionalId which fences the current one"),
    entry!(91, "RESOURCE_NOT_FOUND", "Broker: Request illegally referred to resource that does not exist"),
    entry!(92, "DUPLICATE_RESOURCE", "Broker: Request illegally referred to the same resource twice"),
    entry!(93, "UNACCEPTABLE_CREDENTIAL", "Broker: Requested credential would not meet criteria for acceptability"),
    entry!(94, "INCONSISTENT_VOTER_SET", "Broker: Indicates that the either the sender or recipient of a voter-only request is not one of the expected voters"),
    entry!(95, "INVALID_UPDATE_VERSION", "Broker: Invalid update version"),
    entry!(96, "FEATURE_UPDATE_FAILED", "Broker: Unable to update finalized features due to server error"),
    entry!(97, "PRINCIPAL_DESERIALIZATION_FAILURE", "Broker: Request principal deserialization failed during forwarding"),
    entry!(98, "SNAPSHOT_NOT_FOUND", "Broker: Requested snapshot was not found"),
    entry!(99, "POSITION_OUT_OF_RANGE", "Broker: Requested position is not greater than or equal to zero, and less than the size of the snapshot"),
    entry!(100, "UNKNOWN_TOPIC_ID", "Broker: This server does not host this topic ID"),
    entry!(101, "DUPLICATE_BROKER_REGISTRATION", "Broker: This broker ID is already in use"),
    entry!(102, "BROKER_ID_NOT_REGISTERED", "Broker: The given broker ID was not registered"),
    entry!(103, "INCONSISTENT_TOPIC_ID", "Broker: The log's topic ID did not match the topic ID in the request"),
    entry!(104, "INCONSISTENT_CLUSTER_ID", "Broker: The clusterId in the request does not match that found on the server"),
    entry!(105, "TRANSACTIONAL_ID_NOT_FOUND", "Broker: The transactionalId could not be found"),
    entry!(106, "FETCH_SESSION_TOPIC_ID_ERROR", "Broker: Fetch session topic ID error"),
    entry!(107, "INELIGIBLE_REPLICA", "Broker: The new ISR contains at least one ineligible replica"),
    entry!(108, "NEW_LEADER_ELECTED", "Broker: The AlterPartition request successfully updated the partition state but the leader has changed"),
    entry!(109, "OFFSET_MOVED_TO_TIERED_STORAGE", "Broker: The requested offset is moved to tiered storage"),
    entry!(110, "FENCED_MEMBER_EPOCH", "Broker: The member epoch is fenced by the group coordinator"),
    entry!(111, "UNRELEASED_INSTANCE_ID", "Broker: The instance ID is still used by another member in the consumer group"),
    entry!(112, "UNSUPPORTED_ASSIGNOR", "Broker: The assignor or its version range is not supported by the consumer group"),
    entry!(113, "STALE_MEMBER_EPOCH", "Broker: The member epoch is stale"),
    entry!(114, "MISMATCHED_ENDPOINT_TYPE", "Broker: The request was sent to an endpoint of the wrong type"),
    entry!(115, "UNSUPPORTED_ENDPOINT_TYPE", "Broker: This endpoint type is not supported yet"),
    entry!(116, "UNKNOWN_CONTROLLER_ID", "Broker: This controller ID is not known"),
    entry!(117, "UNKNOWN_SUBSCRIPTION_ID", "Broker: Client sent a push telemetry request with an invalid or outdated subscription ID"),
    entry!(118, "TELEMETRY_TOO_LARGE", "Broker: Client sent a push telemetry request larger than the maximum size the broker will accept"),
    entry!(119, "INVALID_REGISTRATION", "Broker: The controller has considered the broker registration to be invalid"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_sorted_and_unique() {
        for pair in ENTRIES.windows(2) {
            assert!(
                pair[0].code < pair[1].code,
                "table out of order at {} / {}",
                pair[0].code,
                pair[1].code
            );
        }
        let names: HashSet<_> = ENTRIES.iter().map(|e| e.name).collect();
        assert_eq!(names.len(), ENTRIES.len());
    }

    #[test]
    fn test_lookup_success() {
        let entry = lookup(ErrorCode::NO_ERROR);
        assert_eq!(entry.code, 0);
        assert_eq!(entry.name, "NO_ERROR");
        assert!(ErrorCode::NO_ERROR.is_success());
        assert_eq!(ErrorCode::default(), ErrorCode::NO_ERROR);
    }

    #[test]
    fn test_lookup_unknown_falls_back() {
        assert_eq!(lookup(ErrorCode(9999)), &UNKNOWN_ENTRY);
        assert_eq!(lookup(ErrorCode(-500)).name, "UNKNOWN_CODE");
        assert_eq!(ErrorCode(12345).message(), "Unknown error code");
    }

    #[test]
    fn test_named_constants_match_table() {
        let named = [
            (ErrorCode::PARTITION_EOF, "_PARTITION_EOF"),
            (ErrorCode::QUEUE_FULL, "_QUEUE_FULL"),
            (ErrorCode::MSG_TIMED_OUT, "_MSG_TIMED_OUT"),
            (ErrorCode::ALL_BROKERS_DOWN, "_ALL_BROKERS_DOWN"),
            (ErrorCode::FATAL, "_FATAL"),
            (ErrorCode::ASSIGNMENT_LOST, "_ASSIGNMENT_LOST"),
            (ErrorCode::UNKNOWN, "UNKNOWN"),
            (ErrorCode::REBALANCE_IN_PROGRESS, "REBALANCE_IN_PROGRESS"),
            (ErrorCode::MSG_SIZE_TOO_LARGE, "MSG_SIZE_TOO_LARGE"),
            (ErrorCode::SASL_AUTHENTICATION_FAILED, "SASL_AUTHENTICATION_FAILED"),
            (ErrorCode::LOG_TRUNCATION, "_LOG_TRUNCATION"),
            (ErrorCode::MEMBER_ID_REQUIRED, "MEMBER_ID_REQUIRED"),
            (ErrorCode::FENCED_INSTANCE_ID, "FENCED_INSTANCE_ID"),
            (ErrorCode::UNSTABLE_OFFSET_COMMIT, "UNSTABLE_OFFSET_COMMIT"),
        ];
        for (code, name) in named {
            assert_eq!(code.name(), name);
        }
    }

    #[test]
    fn test_code_space_bounds() {
        assert_eq!(lookup(ErrorCode(-137)).name, "_DESTROY_BROKER");
        assert_eq!(lookup(ErrorCode(119)).name, "INVALID_REGISTRATION");
        assert_eq!(lookup(ErrorCode(120)), &UNKNOWN_ENTRY);

        // Broker codes form a contiguous range
        let broker: Vec<i32> = ENTRIES.iter().map(|e| e.code).filter(|c| *c >= -1).collect();
        assert_eq!(broker, (-1..=119).collect::<Vec<_>>());
    }

    #[test]
    fn test_by_name() {
        let entry = by_name("REBALANCE_IN_PROGRESS").unwrap();
        assert_eq!(entry.code, 27);
        assert!(by_name("NOT_A_CODE").is_none());
        assert_eq!(entries().count(), ENTRIES.len());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ErrorCode::ALL_BROKERS_DOWN.is_fatal());
        assert!(ErrorCode::GROUP_AUTHORIZATION_FAILED.is_fatal());
        assert!(!ErrorCode::PARTITION_EOF.is_fatal());
        assert!(!ErrorCode::REBALANCE_IN_PROGRESS.is_fatal());
        assert!(!ErrorCode::QUEUE_FULL.is_fatal());
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::QUEUE_FULL.to_string(), "_QUEUE_FULL (-184)");
    }
}
