//! Sample handlers: a small in-memory economy under `/eco`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use bigdecimal::BigDecimal;
use cmdforge_commands::{CommandHandler, Invocation, RouteSpec};
use cmdforge_core::{Identity, Invoker};
use parking_lot::Mutex;
use tracing::info;

use crate::invokers::{ConsoleSender, PlayerSender};

/// Balances keyed by identity name.
#[derive(Default)]
pub struct Ledger {
    balances: Mutex<HashMap<String, BigDecimal>>,
}

impl Ledger {
    pub fn balance(&self, name: &str) -> BigDecimal {
        self.balances.lock().get(name).cloned().unwrap_or_default()
    }

    pub fn deposit(&self, name: &str, amount: BigDecimal) {
        let mut balances = self.balances.lock();
        let entry = balances.entry(name.to_string()).or_default();
        *entry = &*entry + amount;
    }

    pub fn transfer(&self, from: &str, to: &str, amount: &BigDecimal) -> Result<()> {
        let mut balances = self.balances.lock();
        let available = balances.get(from).cloned().unwrap_or_default();
        if &available < amount {
            bail!("{from} has {available}, needs {amount}");
        }
        balances.insert(from.to_string(), available - amount);
        let target = balances.entry(to.to_string()).or_default();
        *target = &*target + amount;
        Ok(())
    }

    pub fn reset(&self, name: &str) {
        self.balances.lock().remove(name);
    }

    /// Richest first, ties by name.
    pub fn top(&self, count: usize) -> Vec<(String, BigDecimal)> {
        let mut all: Vec<_> = self
            .balances
            .lock()
            .iter()
            .map(|(name, amount)| (name.clone(), amount.clone()))
            .collect();
        all.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        all.truncate(count);
        all
    }
}

// ---------------------------------------------------------------------------
// /eco
// ---------------------------------------------------------------------------

pub struct EcoCommands {
    ledger: Arc<Ledger>,
}

impl EcoCommands {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    fn usage(&self, inv: &mut Invocation) -> Result<()> {
        inv.reply("Usage: /eco balance [player] | top [count] | give <player> <amount> | pay <player> <amount>");
        Ok(())
    }

    fn balance(&self, inv: &mut Invocation) -> Result<()> {
        let name = inv.invoker().name().to_string();
        let amount = self.ledger.balance(&name);
        inv.reply(format!("Balance: {amount}"));
        Ok(())
    }

    fn balance_of(&self, inv: &mut Invocation) -> Result<()> {
        let player = inv.arg::<Identity>("player")?;
        let amount = self.ledger.balance(&player.name);
        inv.reply(format!("{}'s balance: {amount}", player.name));
        Ok(())
    }

    fn top(&self, inv: &mut Invocation) -> Result<()> {
        // Raw text when neither the token nor the default resolved.
        let count = inv.arguments().get::<i32>("count").copied().unwrap_or(5);
        let rows = self.ledger.top(count.max(0) as usize);
        if rows.is_empty() {
            inv.reply("Nobody has any money yet.");
        }
        for (rank, (name, amount)) in rows.iter().enumerate() {
            inv.reply(format!("{}. {name}: {amount}", rank + 1));
        }
        Ok(())
    }

    fn give(&self, inv: &mut Invocation) -> Result<()> {
        let player = inv.arg::<Identity>("player")?.name.clone();
        let amount = *inv.arg::<i64>("amount")?;
        if amount <= 0 {
            inv.reply("Amount must be positive.");
            return Ok(());
        }
        self.ledger.deposit(&player, BigDecimal::from(amount));
        info!(by = inv.invoker().name(), to = %player, amount, "Granted funds");
        inv.reply(format!("Gave {amount} to {player}."));
        Ok(())
    }

    fn pay(&self, inv: &mut Invocation) -> Result<()> {
        let from = inv.sender::<PlayerSender>()?.name().to_string();
        let to = inv.arg::<Identity>("player")?.name.clone();
        let amount = inv.arg::<BigDecimal>("amount")?.clone();
        if amount <= BigDecimal::from(0) {
            inv.reply("Amount must be positive.");
            return Ok(());
        }
        if from == to {
            inv.reply("You cannot pay yourself.");
            return Ok(());
        }
        match self.ledger.transfer(&from, &to, &amount) {
            Ok(()) => inv.reply(format!("Paid {amount} to {to}.")),
            Err(_) => inv.reply("Insufficient funds."),
        }
        Ok(())
    }
}

impl CommandHandler for EcoCommands {
    fn name(&self) -> &str {
        "eco"
    }

    fn roots(&self) -> &[&str] {
        &["eco", "economy"]
    }

    fn permission(&self) -> Option<&str> {
        Some("eco.use")
    }

    fn routes(&self) -> Vec<RouteSpec<Self>> {
        vec![
            RouteSpec::new("", Self::usage).describe("Show usage"),
            RouteSpec::new("balance", Self::balance)
                .sender::<dyn Invoker>()
                .describe("Your balance"),
            RouteSpec::new("balance <player>", Self::balance_of)
                .arg::<Identity>("player")
                .describe("Another player's balance"),
            RouteSpec::new("top", Self::top)
                .optional::<i32>("count", "5")
                .describe("Richest players"),
            RouteSpec::new("top <count>", Self::top)
                .optional::<i32>("count", "5")
                .describe("Richest players"),
            RouteSpec::new("give <player> <amount>", Self::give)
                .sender::<dyn Invoker>()
                .arg::<Identity>("player")
                .arg::<i64>("amount")
                .permission("eco.give")
                .run_async()
                .describe("Create money for a player"),
            RouteSpec::new("pay <player> <amount>", Self::pay)
                .sender::<PlayerSender>()
                .arg::<Identity>("player")
                .arg::<BigDecimal>("amount")
                .permission("eco.pay")
                .describe("Send money to another player"),
        ]
    }
}

// ---------------------------------------------------------------------------
// /eco admin routes
// ---------------------------------------------------------------------------

pub struct EcoAdmin {
    ledger: Arc<Ledger>,
}

impl EcoAdmin {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    fn reset(&self, inv: &mut Invocation) -> Result<()> {
        inv.sender::<ConsoleSender>()?;
        let player = inv.arg::<Identity>("player")?.name.clone();
        self.ledger.reset(&player);
        inv.reply(format!("Reset {player}."));
        Ok(())
    }
}

impl CommandHandler for EcoAdmin {
    fn name(&self) -> &str {
        "eco-admin"
    }

    fn roots(&self) -> &[&str] {
        &["eco"]
    }

    fn permission(&self) -> Option<&str> {
        Some("eco.admin")
    }

    fn routes(&self) -> Vec<RouteSpec<Self>> {
        vec![RouteSpec::new("reset <player>", Self::reset)
            .sender::<ConsoleSender>()
            .arg::<Identity>("player")
            .describe("Clear a player's balance")]
    }
}
