/// The `Status` field of an SMGP response indicates the success or failure of
/// the matching request. Zero means success; any other value is an error code
/// assigned by the gateway.
///
/// Codes are kept as plain `u32` values because gateways routinely return
/// codes outside the published table.
pub type CommandStatus = u32;

/// Request succeeded.
pub const STATUS_OK: CommandStatus = 0;

/// System busy.
pub const STATUS_SYSTEM_BUSY: CommandStatus = 1;

/// Malformed message structure.
pub const STATUS_INVALID_MESSAGE: CommandStatus = 10;

/// Unknown command word.
pub const STATUS_INVALID_COMMAND: CommandStatus = 11;

/// Authentication failed.
pub const STATUS_AUTH_FAILED: CommandStatus = 21;

const REASONS: &[(CommandStatus, &str)] = &[
    (0, "success"),
    (1, "system busy"),
    (2, "maximum connections exceeded"),
    (10, "invalid message structure"),
    (11, "invalid command word"),
    (12, "duplicate sequence id"),
    (20, "invalid IP address"),
    (21, "authentication failed"),
    (22, "version too high"),
    (30, "invalid message type (MsgType)"),
    (31, "invalid priority (Priority)"),
    (32, "invalid fee type (FeeType)"),
    (33, "invalid fee code (FeeCode)"),
    (34, "invalid message format (MsgFormat)"),
    (35, "invalid time format"),
    (36, "invalid message length (MsgLength)"),
    (37, "validity period expired"),
    (38, "invalid query type (QueryType)"),
    (39, "routing error"),
    (40, "invalid fixed fee (FixedFee)"),
    (41, "invalid update type (UpdateType)"),
    (42, "invalid route id (RouteId)"),
    (43, "invalid service id (ServiceId)"),
    (44, "invalid validity period (ValidTime)"),
    (45, "invalid scheduled time (AtTime)"),
    (46, "invalid source terminal (SrcTermId)"),
    (47, "invalid destination terminal (DestTermId)"),
    (48, "invalid charged terminal (ChargeTermId)"),
    (49, "invalid SP code (SPCode)"),
    (56, "invalid source gateway (SrcGatewayID)"),
    (57, "invalid query terminal (QueryTermID)"),
    (58, "no matching route"),
    (59, "invalid SP type (SPType)"),
    (60, "invalid previous route id (LastRouteID)"),
    (61, "invalid route type (RouteType)"),
    (62, "invalid destination gateway (DestGatewayID)"),
    (63, "invalid destination gateway IP (DestGatewayIP)"),
    (64, "invalid destination gateway port (DestGatewayPort)"),
    (65, "invalid terminal range (TermRangeID)"),
    (66, "invalid province code (ProvinceCode)"),
    (67, "invalid user type (UserType)"),
    (68, "route updates not supported by this node"),
    (69, "invalid SP enterprise code (SPID)"),
    (70, "invalid SP access type (SPAccessType)"),
    (71, "route update failed"),
    (72, "invalid timestamp (Time)"),
    (73, "invalid service code (MServiceID)"),
    (74, "SP sending outside permitted hours"),
    (75, "SP daily volume exceeded"),
    (76, "SP account expired"),
];

/// Human-readable reason for a status code, if the code is in the published table.
pub fn status_reason(status: CommandStatus) -> Option<&'static str> {
    REASONS
        .binary_search_by_key(&status, |(code, _)| *code)
        .ok()
        .map(|index| REASONS[index].1)
}

/// Reason text for any status code, falling back to the numeric value.
pub fn describe_status(status: CommandStatus) -> String {
    match status_reason(status) {
        Some(reason) => reason.to_string(),
        None => format!("unknown status {status}"),
    }
}
