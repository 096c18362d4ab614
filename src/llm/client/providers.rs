//! 按配置构建 rig 客户端与单轮研究 Agent

use anyhow::Result;
use rig::{
    agent::{Agent, AgentBuilder},
    client::CompletionClient,
    completion::{CompletionModel, Prompt},
    providers::gemini::completion::gemini_api_types::{AdditionalParameters, GenerationConfig},
    providers::{anthropic, deepseek, gemini, mistral, moonshot, ollama, openai, openrouter},
};

use crate::config::{LLMConfig, LLMProvider};

/// 配置中显式指定的API基地址，未指定时交给各Provider使用默认地址
fn base_url_override(config: &LLMConfig) -> Option<&str> {
    let url = config.api_base_url.trim().trim_end_matches('/');
    (!url.is_empty()).then_some(url)
}

macro_rules! with_base_url {
    ($builder:expr, $url:expr) => {{
        let builder = $builder;
        match $url {
            Some(url) => builder.base_url(url),
            None => builder,
        }
    }};
}

/// 已配置好的 rig 客户端
#[derive(Clone, Debug)]
pub enum ProviderClient {
    OpenAI(openai::Client),
    Moonshot(moonshot::Client),
    DeepSeek(deepseek::Client),
    Mistral(mistral::Client),
    OpenRouter(openrouter::Client),
    Anthropic(anthropic::Client),
    Gemini(gemini::Client),
    Ollama(ollama::Client),
}

impl ProviderClient {
    pub fn new(config: &LLMConfig) -> Result<Self> {
        let key = config.api_key.as_str();
        let url = base_url_override(config);

        let client = match config.provider {
            LLMProvider::OpenAI => {
                Self::OpenAI(with_base_url!(openai::Client::builder(key), url).build())
            }
            LLMProvider::Moonshot => {
                Self::Moonshot(with_base_url!(moonshot::Client::builder(key), url).build())
            }
            LLMProvider::DeepSeek => {
                Self::DeepSeek(with_base_url!(deepseek::Client::builder(key), url).build())
            }
            LLMProvider::Mistral => {
                Self::Mistral(with_base_url!(mistral::Client::builder(key), url).build())
            }
            LLMProvider::OpenRouter => {
                Self::OpenRouter(with_base_url!(openrouter::Client::builder(key), url).build())
            }
            LLMProvider::Anthropic => {
                Self::Anthropic(with_base_url!(anthropic::Client::builder(key), url).build()?)
            }
            LLMProvider::Gemini => {
                Self::Gemini(with_base_url!(gemini::Client::builder(key), url).build()?)
            }
            LLMProvider::Ollama => {
                Self::Ollama(with_base_url!(ollama::Client::builder(), url).build())
            }
        };
        Ok(client)
    }

    /// 创建不带工具的单轮Agent
    pub fn create_agent(&self, system_prompt: &str, config: &LLMConfig) -> Result<ProviderAgent> {
        let model = config.model.as_str();
        let agent = match self {
            // 使用 chat completions 接口，兼容 OpenAI 协议的网关
            Self::OpenAI(client) => ProviderAgent::OpenAI(single_turn(
                client
                    .completion_model(model)
                    .completions_api()
                    .into_agent_builder(),
                system_prompt,
                config,
            )),
            Self::Moonshot(client) => {
                ProviderAgent::Moonshot(single_turn(client.agent(model), system_prompt, config))
            }
            Self::DeepSeek(client) => {
                ProviderAgent::DeepSeek(single_turn(client.agent(model), system_prompt, config))
            }
            Self::Mistral(client) => {
                ProviderAgent::Mistral(single_turn(client.agent(model), system_prompt, config))
            }
            Self::OpenRouter(client) => {
                ProviderAgent::OpenRouter(single_turn(client.agent(model), system_prompt, config))
            }
            Self::Anthropic(client) => {
                ProviderAgent::Anthropic(single_turn(client.agent(model), system_prompt, config))
            }
            Self::Gemini(client) => {
                let params = AdditionalParameters::default().with_config(GenerationConfig::default());
                ProviderAgent::Gemini(single_turn(
                    client
                        .agent(model)
                        .additional_params(serde_json::to_value(params)?),
                    system_prompt,
                    config,
                ))
            }
            Self::Ollama(client) => {
                ProviderAgent::Ollama(single_turn(client.agent(model), system_prompt, config))
            }
        };
        Ok(agent)
    }
}

fn single_turn<M: CompletionModel>(
    builder: AgentBuilder<M>,
    system_prompt: &str,
    config: &LLMConfig,
) -> Agent<M> {
    builder
        .preamble(system_prompt)
        .max_tokens(config.max_tokens.into())
        .temperature(config.temperature)
        .build()
}

pub enum ProviderAgent {
    OpenAI(Agent<openai::CompletionModel>),
    Moonshot(Agent<moonshot::CompletionModel>),
    DeepSeek(Agent<deepseek::CompletionModel>),
    Mistral(Agent<mistral::CompletionModel>),
    OpenRouter(Agent<openrouter::CompletionModel>),
    Anthropic(Agent<anthropic::completion::CompletionModel>),
    Gemini(Agent<gemini::completion::CompletionModel>),
    Ollama(Agent<ollama::CompletionModel<reqwest::Client>>),
}

impl ProviderAgent {
    pub async fn prompt(&self, prompt: &str) -> Result<String> {
        let response = match self {
            Self::OpenAI(agent) => agent.prompt(prompt).await?,
            Self::Moonshot(agent) => agent.prompt(prompt).await?,
            Self::DeepSeek(agent) => agent.prompt(prompt).await?,
            Self::Mistral(agent) => agent.prompt(prompt).await?,
            Self::OpenRouter(agent) => agent.prompt(prompt).await?,
            Self::Anthropic(agent) => agent.prompt(prompt).await?,
            Self::Gemini(agent) => agent.prompt(prompt).await?,
            Self::Ollama(agent) => agent.prompt(prompt).await?,
        };
        Ok(response)
    }
}
