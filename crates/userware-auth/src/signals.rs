//! Account signals.

use userware_signals::Signal;

use crate::account::Account;

/// Payload of [`AccountSignals::user_switched_on`].
#[derive(Debug, Clone)]
pub struct UserSwitchedOn {
    /// The authenticated principal who requested the switch.
    pub sender: Account,
    /// The identifier written into the session.
    pub switched_username: String,
}

/// Signals sent by the account views. Owned by the application state;
/// connect receivers at startup.
#[derive(Debug, Default)]
pub struct AccountSignals {
    /// Sent after a successful switch-on.
    pub user_switched_on: Signal<UserSwitchedOn>,
}
