use std::{sync::Arc, time::Duration};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use crm_core::{
    auth::AuthContext, config::Config, domain::AccountId, fanout::NotificationFanout,
    importer::ContactImporter, ingest::MessagePipeline, pending::PendingIntents,
    port::Messenger, resolver::ContactResolver, stats::StatsService,
};
use crm_db::CrmDb;

use crate::handlers;
use crate::{BotApiDirectory, TelegramMessenger};

/// How long a "send the message text now" prompt stays armed.
const PENDING_INTENT_TTL: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub db: CrmDb,
    pub auth: AuthContext,
    pub pipeline: MessagePipeline,
    pub importer: ContactImporter,
    pub stats: StatsService,
    pub pending: Arc<PendingIntents>,
}

pub async fn run_polling(cfg: Arc<Config>, db: CrmDb) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        tracing::info!("crm bot started: @{}", me.username());
    }

    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(bot.clone()));
    let auth = AuthContext::new(AccountId(cfg.owner_id), db.clone());
    let fanout = NotificationFanout::new(messenger.clone(), db.clone(), cfg.platform_timeout);
    let pipeline = MessagePipeline::new(
        db.clone(),
        ContactResolver::new(db.clone()),
        fanout,
        messenger.clone(),
    );
    let importer = ContactImporter::new(
        Arc::new(BotApiDirectory),
        db.clone(),
        cfg.import_delay,
        cfg.platform_timeout,
        cfg.max_imports_per_hour,
    );
    let stats = StatsService::new(db.clone());

    let state = Arc::new(AppState {
        cfg,
        db,
        auth,
        pipeline,
        importer,
        stats,
        pending: Arc::new(PendingIntents::new(PENDING_INTENT_TTL)),
    });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
