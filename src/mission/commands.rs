//! Outgoing mission-protocol messages.

use crate::protocol::{Encoder, Value, ids};
use crate::types::MissionItem;
use crate::types::mav_flags::MISSION_TYPE_MISSION;
use bytes::Bytes;

/// A message the mission state machine wants sent to the vehicle.
#[derive(Debug, Clone, PartialEq)]
pub enum MissionOutbound {
    ClearAll,
    Count(u16),
    Item(MissionItem),
    RequestList,
    RequestItem(u16),
    Ack(u8),
}

impl MissionOutbound {
    pub fn message_id(&self) -> u32 {
        match self {
            MissionOutbound::ClearAll => ids::MISSION_CLEAR_ALL,
            MissionOutbound::Count(_) => ids::MISSION_COUNT,
            MissionOutbound::Item(_) => ids::MISSION_ITEM_INT,
            MissionOutbound::RequestList => ids::MISSION_REQUEST_LIST,
            MissionOutbound::RequestItem(_) => ids::MISSION_REQUEST_INT,
            MissionOutbound::Ack(_) => ids::MISSION_ACK,
        }
    }

    /// Field values addressed to `(system_id, component_id)`.
    pub fn fields(&self, system_id: u8, component_id: u8) -> Vec<(&'static str, Value)> {
        let mut fields = vec![
            ("target_system", Value::UInt8(system_id)),
            ("target_component", Value::UInt8(component_id)),
            ("mission_type", Value::UInt8(MISSION_TYPE_MISSION)),
        ];
        match self {
            MissionOutbound::ClearAll | MissionOutbound::RequestList => {}
            MissionOutbound::Count(count) => fields.push(("count", Value::UInt16(*count))),
            MissionOutbound::RequestItem(seq) => fields.push(("seq", Value::UInt16(*seq))),
            MissionOutbound::Ack(result) => fields.push(("type", Value::UInt8(*result))),
            MissionOutbound::Item(item) => fields.extend([
                ("seq", Value::UInt16(item.seq)),
                ("frame", Value::UInt8(item.frame)),
                ("command", Value::UInt16(item.command)),
                ("current", Value::UInt8(u8::from(item.seq == 0))),
                ("autocontinue", Value::UInt8(u8::from(item.autocontinue))),
                ("param1", Value::Float32(item.param1)),
                ("param2", Value::Float32(item.param2)),
                ("param3", Value::Float32(item.param3)),
                ("param4", Value::Float32(item.param4)),
                ("x", Value::Int32(item.latitude_e7())),
                ("y", Value::Int32(item.longitude_e7())),
                ("z", Value::Float32(item.altitude)),
            ]),
        }
        fields
    }

    pub fn encode(&self, encoder: &Encoder, system_id: u8, component_id: u8) -> Bytes {
        let fields = self.fields(system_id, component_id);
        encoder.encode(self.message_id(), &fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse;

    #[test]
    fn item_encoding_scales_coordinates_and_flags_current() {
        let encoder = Encoder::new(255, 190);
        let item = MissionItem::waypoint(0, 47.3977419, 8.5455938, 120.0);
        let frame = MissionOutbound::Item(item.clone()).encode(&encoder, 1, 1);
        let msg = parse(&frame).expect("valid");

        assert_eq!(msg.message_id, ids::MISSION_ITEM_INT);
        assert_eq!(msg.get::<i32>("x"), Some(473_977_419));
        assert_eq!(msg.get::<i32>("y"), Some(85_455_938));
        assert_eq!(msg.get::<u8>("current"), Some(1));
        assert_eq!(msg.get::<u8>("frame"), Some(3));
        assert_eq!(msg.get::<u8>("target_system"), Some(1));
        assert_eq!(MissionItem::from_message(&msg), item);

        let second = MissionItem { seq: 1, ..item };
        let msg = parse(&MissionOutbound::Item(second).encode(&encoder, 1, 1)).expect("valid");
        assert_eq!(msg.get::<u8>("current"), Some(0));
    }

    #[test]
    fn count_and_request_fields() {
        let encoder = Encoder::new(255, 190);
        let msg = parse(&MissionOutbound::Count(3).encode(&encoder, 7, 1)).expect("valid");
        assert_eq!(msg.get::<u16>("count"), Some(3));
        assert_eq!(msg.get::<u8>("target_system"), Some(7));

        let msg = parse(&MissionOutbound::RequestItem(2).encode(&encoder, 7, 1)).expect("valid");
        assert_eq!(msg.message_id, ids::MISSION_REQUEST_INT);
        assert_eq!(msg.get::<u16>("seq"), Some(2));

        let msg = parse(&MissionOutbound::Ack(0).encode(&encoder, 7, 1)).expect("valid");
        assert_eq!(msg.get::<u8>("type"), Some(0));
    }
}
