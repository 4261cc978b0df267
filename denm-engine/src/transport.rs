//! Boundary towards the geographic broadcast transport.

use bytes::Bytes;

use denm_core::geo::Position;
use denm_core::station::StationId;
use denm_protocols::DataRequest;

/// Station handing a request to the transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Origin {
    pub station: StationId,
    pub position: Position,
}

/// Fire-and-forget send. Implementations must not report delivery.
pub trait Transport {
    fn data_request(&mut self, origin: Origin, request: DataRequest, payload: Bytes);
}
