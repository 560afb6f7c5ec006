/// Hop ceiling applied to transit (data) packets. A transit packet whose
/// `hop` counter has reached this value is dropped rather than forwarded
/// again; control packets are exempt, since they always carry `hop = 1`
/// and are never re-broadcast verbatim.
pub const MAX_HOP: u32 = 16;
