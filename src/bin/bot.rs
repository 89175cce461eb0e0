use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info, warn};
use serenity::async_trait;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::channel::Message;
use serenity::model::gateway::{Activity, Ready};
use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::*;
use std::sync::Arc;

use relay::commands::{
    register_global_commands, register_guild_commands, CommandContext, CommandRegistry,
};
use relay::core::error::TRANSPORT_MESSAGE;
use relay::core::{Config, Session};
use relay::database::Database;
use relay::features::dispatch::{
    dispatch_queue, DiscordDestination, DiscordSender, DispatchReceiver, DispatchWorker,
    RequestContext,
};
use relay::features::startup::{enqueue_priming, take_first_ready, Priming};

struct Handler {
    registry: CommandRegistry,
    context: Arc<CommandContext>,
    guild_id: Option<GuildId>,
    /// Handed to the dispatch worker on the first Ready event
    receiver: Mutex<Option<DispatchReceiver<DiscordDestination>>>,
}

impl Handler {
    fn new(
        context: CommandContext,
        guild_id: Option<GuildId>,
        receiver: DispatchReceiver<DiscordDestination>,
    ) -> Self {
        Self {
            registry: CommandRegistry::with_all_handlers(),
            context: Arc::new(context),
            guild_id,
            receiver: Mutex::new(Some(receiver)),
        }
    }

    fn prime(&self) {
        match enqueue_priming(&self.context.queue, &self.context.session, |id| {
            DiscordDestination::Channel(ChannelId(id))
        }) {
            Ok(Priming::Enqueued(order)) => info!("🚀 Startup prompt queued as item #{order}"),
            Ok(_) => {}
            Err(e) => error!("Could not queue startup prompt: {e}"),
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, _ctx: Context, msg: Message) {
        if msg.author.bot || !self.context.session.accepts_passive(msg.channel_id.0) {
            return;
        }
        if msg.content.trim().is_empty() {
            return;
        }

        let requester = self.context.requester(msg.author.id.0).await;
        let destination = DiscordDestination::Channel(msg.channel_id);
        match self
            .context
            .queue
            .enqueue(RequestContext::new(destination, requester), msg.content.as_str())
        {
            Ok(order) => info!(
                "Queued message from {} in channel {} as item #{order}",
                msg.author.id, msg.channel_id
            ),
            Err(e) => error!("Could not queue message from {}: {e}", msg.author.id),
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        info!("🤖 Bot ID: {}", ready.user.id);

        ctx.set_activity(Activity::listening("/chat | /help")).await;

        // Priming goes in before the worker starts so it is answered first
        if take_first_ready() {
            self.prime();
        }

        if let Some(receiver) = self.receiver.lock().await.take() {
            let worker = DispatchWorker::new(
                self.context.session.clone(),
                Arc::new(DiscordSender::new(ctx.http.clone())),
            );
            tokio::spawn(worker.run(receiver));
        } else {
            info!("Reconnected, dispatch worker already running");
        }

        let registered = match self.guild_id {
            Some(guild_id) => register_guild_commands(&ctx, guild_id).await,
            None => register_global_commands(&ctx).await,
        };
        if let Err(e) = registered {
            error!("Failed to register slash commands: {e}");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::ApplicationCommand(command) = interaction else {
            return;
        };

        if let Err(e) = self
            .registry
            .dispatch(self.context.clone(), &ctx, &command)
            .await
        {
            error!("Error handling slash command '{}': {e:#}", command.data.name);

            // The handler may or may not have acknowledged the interaction yet
            if command
                .create_followup_message(&ctx.http, |m| m.content(TRANSPORT_MESSAGE))
                .await
                .is_err()
            {
                let _ = command
                    .create_interaction_response(&ctx.http, |response| {
                        response
                            .kind(InteractionResponseType::ChannelMessageWithSource)
                            .interaction_response_data(|message| message.content(TRANSPORT_MESSAGE))
                    })
                    .await;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    // The openai crate reads its key from the environment, not from our config
    match &config.openai_api_key {
        Some(key) => {
            std::env::set_var("OPENAI_API_KEY", key);
            std::env::set_var("OPENAI_KEY", key);
        }
        None => warn!("OPENAI_API_KEY not set; the API key backend and /draw are unavailable"),
    }

    info!("Starting relay bot v{}...", env!("CARGO_PKG_VERSION"));

    let session = Arc::new(Session::from_config(&config)?);
    let database = Database::new(&config.database_path).await?;
    let image_generator = config.image_generator()?;
    let (queue, receiver) = dispatch_queue();

    let context = CommandContext::new(session, queue, database, image_generator);

    // Parse guild ID if provided for development mode
    let guild_id = config
        .discord_guild_id
        .as_ref()
        .and_then(|id| id.parse::<u64>().ok())
        .map(GuildId);

    let handler = Handler::new(context, guild_id, receiver);

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    info!("Establishing WebSocket connection to Discord gateway...");
    info!("Gateway intents: {intents:?}");

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    Ok(())
}
