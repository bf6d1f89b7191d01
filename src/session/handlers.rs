//! Handler table wiring decoded messages into the session components.
//!
//! Handlers capture an `Arc<LinkCore>`; the dispatcher holding them is owned by the
//! ingest task, never by the core, so there is no reference cycle.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::core::LinkCore;
use crate::Result;
use crate::link::CommandKey;
use crate::protocol::{Dispatcher, MessageHandler, ParsedMessage, handler, ids};
use crate::types::{
    AttitudeState, AutopilotMessage, BatteryState, CommandAck, CommandAckResult, HeartbeatState,
    MessageSeverity, MissionItem, ParamValue, PositionState, RcChannels, VfrHudState,
};

type Handle = fn(&LinkCore, &ParsedMessage, Instant);

fn bind(core: &Arc<LinkCore>, message_id: u32, f: Handle) -> Box<dyn MessageHandler> {
    let core = core.clone();
    handler(message_id, move |msg| f(&core, msg, Instant::now()))
}

/// Build the dispatcher for every message the session consumes.
pub(crate) fn dispatcher(core: &Arc<LinkCore>) -> Result<Dispatcher> {
    let table: [(u32, Handle); 14] = [
        (ids::HEARTBEAT, on_heartbeat),
        (ids::SYS_STATUS, on_sys_status),
        (ids::ATTITUDE, on_attitude),
        (ids::GLOBAL_POSITION_INT, on_position),
        (ids::VFR_HUD, on_vfr_hud),
        (ids::RC_CHANNELS, on_rc_channels),
        (ids::STATUSTEXT, on_statustext),
        (ids::PARAM_VALUE, on_param_value),
        (ids::COMMAND_ACK, on_command_ack),
        (ids::MISSION_COUNT, on_mission_count),
        (ids::MISSION_ITEM_INT, on_mission_item),
        (ids::MISSION_REQUEST_INT, on_mission_request),
        (ids::MISSION_REQUEST, on_mission_request),
        (ids::MISSION_ACK, on_mission_ack),
    ];
    Dispatcher::new(table.into_iter().map(|(id, f)| bind(core, id, f)))
}

fn on_heartbeat(core: &LinkCore, msg: &ParsedMessage, now: Instant) {
    let identity = &core.config.identity;
    if (msg.system_id, msg.component_id) == (identity.system_id, identity.component_id) {
        trace!("Ignoring heartbeat carrying our own identity");
        return;
    }
    let heartbeat = HeartbeatState::from_message(msg, now);
    // The tracker only publishes transitions; the snapshot still needs the fresh timestamp.
    core.on_heartbeat(msg.system_id, msg.component_id, now);
    core.state.apply_heartbeat(&heartbeat);
    core.on_state_changed(now);
}

fn on_sys_status(core: &LinkCore, msg: &ParsedMessage, now: Instant) {
    core.state.apply_battery(BatteryState::from_message(msg, now));
    core.on_state_changed(now);
}

fn on_attitude(core: &LinkCore, msg: &ParsedMessage, now: Instant) {
    core.state.apply_attitude(AttitudeState::from_message(msg, now));
    core.on_state_changed(now);
}

fn on_position(core: &LinkCore, msg: &ParsedMessage, now: Instant) {
    core.state.apply_position(PositionState::from_message(msg, now));
    core.on_state_changed(now);
}

fn on_vfr_hud(core: &LinkCore, msg: &ParsedMessage, now: Instant) {
    core.state.apply_vfr_hud(VfrHudState::from_message(msg, now));
    core.on_state_changed(now);
}

fn on_rc_channels(core: &LinkCore, msg: &ParsedMessage, now: Instant) {
    let _ = core.events.rc_channels.send(RcChannels::from_message(msg, now));
}

fn on_statustext(core: &LinkCore, msg: &ParsedMessage, now: Instant) {
    let Some(message) = AutopilotMessage::from_message(msg, now) else {
        return;
    };
    match message.severity {
        MessageSeverity::Critical | MessageSeverity::Error => {
            warn!(text = %message.text, "Autopilot reported a problem")
        }
        _ => debug!(text = %message.text, "Autopilot message"),
    }
    let _ = core.events.autopilot_messages.send(message);
}

fn on_param_value(core: &LinkCore, msg: &ParsedMessage, _now: Instant) {
    let param = ParamValue::from_message(msg);
    trace!(id = %param.id, value = param.value, "Parameter value");
    let _ = core.events.parameters.send(param);
}

fn on_command_ack(core: &LinkCore, msg: &ParsedMessage, _now: Instant) {
    let command: u16 = msg.get_or_default("command");
    let raw_result: u8 = msg.get_or_default("result");
    let ack = CommandAck {
        command,
        result: CommandAckResult::from_mav_result(raw_result),
        raw_result,
        system_id: msg.system_id,
        component_id: msg.component_id,
    };
    debug!(command, result = ?ack.result, "Command acknowledged");
    core.acks.on_ack(CommandKey::new(command, msg.system_id, msg.component_id), raw_result);
    let _ = core.events.command_acks.send(ack);
}

fn on_mission_count(core: &LinkCore, msg: &ParsedMessage, _now: Instant) {
    if let Some(reply) = core.mission.on_count(msg.get_or_default("count")) {
        core.queue_mission(reply, msg.system_id, msg.component_id);
    }
}

fn on_mission_item(core: &LinkCore, msg: &ParsedMessage, _now: Instant) {
    if let Some(reply) = core.mission.on_item(MissionItem::from_message(msg)) {
        core.queue_mission(reply, msg.system_id, msg.component_id);
    }
}

fn on_mission_request(core: &LinkCore, msg: &ParsedMessage, _now: Instant) {
    if let Some(reply) = core.mission.on_item_request(msg.get_or_default("seq")) {
        core.queue_mission(reply, msg.system_id, msg.component_id);
    }
}

fn on_mission_ack(core: &LinkCore, msg: &ParsedMessage, _now: Instant) {
    core.mission.on_ack(msg.get_or_default("type"));
}
