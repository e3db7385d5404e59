use crate::battle::BattleAction;
use crate::core::ids::SessionId;
use crate::progression::StatKind;
use serde::Deserialize;

/// Everything a client may send. The first command on a fresh connection
/// must be `Hello`; the rest require the binding it establishes.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    Hello { name: String },
    StartPve,
    FindMatch,
    Action {
        session_id: SessionId,
        action: BattleAction,
    },
    BuyCharacter,
    BuyWeapon,
    Profile,
    SpendStatPoint { stat: StatKind },
}
