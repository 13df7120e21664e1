use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context};
use futures_channel::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::{
    config::ClientConfig,
    database::Database,
    manager::{
        notifications::{Notification, NotificationSender},
        poller::Poller,
        Member,
    },
    net::{websocket::WebsocketLedger, Ledger},
};

/// Highest level. Handles the different [`Member`] profiles a user may have at a time.
/// The UI frontend keeps track of the profile it's on, but should start
/// only one `Client`.
pub struct Client {
    // String is the profile name.
    pub members: scc::HashMap<String, Arc<Member>>,

    pub pollers: scc::HashMap<String, Poller>,

    /// The notification sender allows `Client` to send notifications
    /// to the frontend, which will display them.
    pub notification_sender: Arc<NotificationSender>,

    config: ClientConfig,
}

impl Client {
    pub fn new(config: ClientConfig) -> (Self, UnboundedReceiver<Notification>) {
        let (tx, rx) = futures_channel::mpsc::unbounded();
        (Self::new_with_notif(config, tx), rx)
    }

    pub fn new_with_notif(config: ClientConfig, tx: UnboundedSender<Notification>) -> Self {
        Self {
            members: scc::HashMap::new(),
            pollers: scc::HashMap::new(),
            notification_sender: NotificationSender::new(tx).into(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Same as [`Client::load_profile`] except it keeps the profile in memory,
    /// talking to `ledger`. This mostly exists for testing purposes as the
    /// profile data won't be saved on disk.
    pub async fn load_in_memory_profile(
        &self,
        profile_name: &str,
        ledger: Arc<dyn Ledger>,
    ) -> anyhow::Result<Arc<Member>> {
        if let Some(member) = self.members.get_async(profile_name).await {
            return Ok(member.get().clone());
        }

        let member = Arc::new(Member::open(
            Database::in_memory()?,
            ledger,
            self.config.clone(),
        )?);
        self.add_profile(profile_name.to_owned(), member.clone())
            .await;

        Ok(member)
    }

    /// Loads a profile from disk if it hasn't been loaded already. Its
    /// data lives in its own folder under the local data directory, and it
    /// talks to the configured ledger node.
    pub async fn load_profile(&self, profile_name: &str) -> anyhow::Result<Arc<Member>> {
        if let Some(member) = self.members.get_async(profile_name).await {
            return Ok(member.get().clone());
        }

        let folder = Self::profile_folder(profile_name)?;
        std::fs::create_dir_all(&folder)
            .with_context(|| format!("Could not create {}", folder.display()))?;

        let ledger = Arc::new(WebsocketLedger::new(self.config.server.clone()));
        let member = Arc::new(Member::open(
            Database::new(Some(folder))?,
            ledger,
            self.config.clone(),
        )?);
        self.add_profile(profile_name.to_owned(), member.clone())
            .await;

        Ok(member)
    }

    fn profile_folder(profile_name: &str) -> anyhow::Result<PathBuf> {
        if profile_name.is_empty() || profile_name.contains(std::path::is_separator) {
            bail!("Invalid profile name {profile_name:?}");
        }

        let mut folder =
            dirs::data_local_dir().context("The operating system has no local data folder")?;
        folder.push("gdh-ledger");
        folder.push(profile_name);

        Ok(folder)
    }

    pub async fn add_profile(&self, profile_name: String, member: Arc<Member>) {
        if let Err((name, previous)) = self.members.insert_async(profile_name, member).await {
            log::debug!("Profile {name} is already loaded as {previous:?}");
        }
    }

    /// Starts the poll loop of a loaded profile. Does nothing if it is
    /// already running.
    pub async fn start_polling(&self, profile_name: &str) -> anyhow::Result<()> {
        let Some(member) = self.members.get_async(profile_name).await else {
            bail!("Profile {profile_name} is not loaded");
        };
        let member = member.get().clone();

        if self.pollers.contains_async(profile_name).await {
            return Ok(());
        }

        let poller = Poller::start(member, self.notification_sender.clone());
        if let Err((_, poller)) = self
            .pollers
            .insert_async(profile_name.to_owned(), poller)
            .await
        {
            // Lost a race against another start.
            poller.stop().await;
        }

        Ok(())
    }

    pub async fn stop_polling(&self, profile_name: &str) {
        if let Some((_, poller)) = self.pollers.remove_async(profile_name).await {
            poller.stop().await;
        }
    }

    pub fn send_notification(&self, notification: Notification) {
        self.notification_sender.send_notification(notification);
    }
}
