use regex::Regex;
use tracing::{error, info};

use crate::errors::LlmError;
use crate::models::{
    FullStockData, InvestorProfile, MarketBriefData, NewsItem, PortfolioItemResponse,
};
use crate::services::llm_service::LlmService;
use crate::services::market_data_service::{MarketDataService, BRIEFING_HEADLINES};

/// News items retrieved as context for a single stock analysis.
pub const CONTEXT_NEWS_LIMIT: usize = 5;

pub const NO_NEWS_CHUNK: &str = "No recent news found for this stock.";

pub const STOCK_ANALYSIS_APOLOGY: &str =
    "죄송합니다. 현재 AI 분석을 수행할 수 없습니다. (API 오류 또는 키 설정 확인 필요)";
pub const PORTFOLIO_ADVICE_APOLOGY: &str = "포트폴리오 분석 중 오류가 발생했습니다.";
pub const MARKET_BRIEFING_APOLOGY: &str =
    "죄송합니다. 현재 시장 브리핑을 생성할 수 없습니다. 잠시 후 다시 시도해 주세요.";

const DEFAULT_GOAL: &str = "Balanced Growth and Income";

/// `[YYYY-MM-DD] source: title - description` lines used as retrieved context.
pub fn news_chunks(news: &[NewsItem]) -> Vec<String> {
    if news.is_empty() {
        return vec![NO_NEWS_CHUNK.to_string()];
    }
    news.iter()
        .map(|item| {
            format!(
                "[{}] {}: {} - {}",
                item.published_day(),
                item.source,
                item.title,
                item.description
            )
        })
        .collect()
}

fn goal(profile: &InvestorProfile) -> &str {
    profile.goal.as_deref().unwrap_or(DEFAULT_GOAL)
}

pub fn build_stock_prompt(
    ticker: &str,
    data: &FullStockData,
    context: &[String],
    profile: &InvestorProfile,
) -> String {
    let formatted_context = context
        .iter()
        .map(|chunk| format!("- {}", chunk))
        .collect::<Vec<_>>()
        .join("\n");

    let avoided = if profile.avoided_sectors.is_empty() {
        "None".to_string()
    } else {
        profile.avoided_sectors.join(", ")
    };

    format!(
        r#"
[SYSTEM ROLE]
You are a senior investment analyst for a personal wealth management app.
Your goal is to provide a concise, high-quality analysis of a US stock for a Korean user.
Answer MUST be in Korean.

[USER PROFILE]
- Risk Tolerance: {risk}
- Preferred Sectors: {preferred}
- Avoided Sectors: {avoided}
- Investment Goal: {goal}

[STRUCTURED FINANCIAL DATA]
- Ticker: {ticker}
- Name: {name}
- Sector: {sector}
- Current Price: ${price:.2}
- Dividend Yield: {div_yield}%
- Dividend Frequency: {frequency:?}
- 5Y Growth Rate: {growth}%
- Description: {description}

[RETRIEVED CONTEXT (News, Notes, Reports)]
{formatted_context}

[INSTRUCTIONS]
Based STRICTLY on the data above, generate a report with the following structure:

1. **한 줄 요약**: 핵심 포인트를 한 문장으로 강력하게 요약.
2. **배당 분석**: 배당의 안정성, 성장성 평가. (배당주가 아니라면 성장 재투자 관점에서 서술)
3. **성장 및 비즈니스**: 비즈니스 모델의 견고함과 최근 성장 모멘텀.
4. **밸류에이션 및 리스크**: 현재 가격 매력도와 [RETRIEVED CONTEXT]에서 언급된 리스크 요인 2~3가지.
5. **적합도 점수 (0-10점)**: 사용자 프로필과의 적합도. 반드시 "적합도 점수: N/10" 형식으로 표기.
6. **최종 의견**: 점수를 준 이유 짧게.

DO NOT invent numbers. If data is missing, mention it.
Write in a professional yet easy-to-read tone (polite Korean ~해요체 or ~합니다체).
"#,
        risk = profile.risk_tolerance.as_str(),
        preferred = profile.preferred_sectors.join(", "),
        avoided = avoided,
        goal = goal(profile),
        ticker = ticker,
        name = data.profile.name,
        sector = data.profile.sector,
        price = data.price.price,
        div_yield = data.dividends.div_yield,
        frequency = data.dividends.frequency,
        growth = data.dividends.growth_rate_5y,
        description = data.profile.description,
        formatted_context = formatted_context,
    )
}

pub fn build_portfolio_prompt(holdings: &[PortfolioItemResponse], profile: &InvestorProfile) -> String {
    let total_value: f64 = holdings.iter().map(|h| h.current_value).sum();
    let holdings_text: String = holdings
        .iter()
        .map(|h| {
            format!(
                "- {}: {} shares @ ${:.2} (Current: ${:.2}, Val: ${:.2})\n",
                h.ticker, h.shares, h.average_cost, h.current_price, h.current_value
            )
        })
        .collect();

    format!(
        r#"
[SYSTEM ROLE]
You are a highly experienced personal investment consultant.
Your client has a specific stock portfolio and wants daily advice and a health check.
Answer MUST be in Korean.

[CLIENT PROFILE]
- Risk Tolerance: {risk}
- Investment Goal: {goal}

[PORTFOLIO SUMMARY]
Total Value: ${total_value:.2}
Holdings:
{holdings_text}
[INSTRUCTIONS]
Based on the portfolio above, provide a detailed and actionable report:

1.  **📊 포트폴리오 정밀 진단 (Weakness Analysis)**:
    -   섹터 편중, 배당 안정성, 성장성 부족 등 **취약점**을 날카롭게 지적해주세요.

2.  **⚖️ 리밸런싱 제안 (Rebalancing)**:
    -   **비중을 줄여야 할 종목**과 **늘려야 할 종목**을 콕 집어주세요.

3.  **💎 AI 추천 종목 (Stock Gems)**:
    -   사용자의 투자 성향({risk} / {goal})에 부합하는 **미국 주식 3개**를 추천해주세요.
    -   각 추천 종목에 대해 **티커(Ticker)**와 **추천 이유**를 명시하세요.

4.  **💡 오늘의 투자 조언**:
    -   현재 시장 상황을 고려한 단기 대응 전략.

Write in a warm but expert tone (Korean ~해요체/합니다체). Use Markdown formatting strictly.
"#,
        risk = profile.risk_tolerance.as_str(),
        goal = goal(profile),
        total_value = total_value,
        holdings_text = holdings_text,
    )
}

pub fn build_market_prompt(data: &MarketBriefData) -> String {
    let indices_text = data
        .indices
        .iter()
        .map(|(symbol, quote)| format!("{}: ${:.2} ({:.2}%)", symbol, quote.price, quote.change_percent))
        .collect::<Vec<_>>()
        .join(", ");

    let news_text = data
        .news
        .iter()
        .take(BRIEFING_HEADLINES)
        .map(|item| format!("- [{}] {} ({})", item.published_day(), item.title, item.source))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"
[SYSTEM ROLE]
You are a top-tier financial news anchor (like Bloomberg or CNBC) for a Korean audience.
Your task is to produce a "Daily Market Briefing" (오늘의 미국 증시 브리핑).

[MARKET DATA]
Indices: {indices_text}

[TOP NEWS HEADLINES]
{news_text}

[INSTRUCTIONS]
Based on the data above, write a professional, engaging, and insightful market report in Korean.
Structure:

# 🇺🇸 오늘의 미국 증시 요약
(Summarize the overall market sentiment based on indices data. Bullish/Bearish/Mixed?)

## 📰 주요 헤드라인
(Bulleted list of the most critical news items, rewritten in natural Korean.)

## 🧐 심층 분석 및 전망
(Explain WHY the market moved this way. Provide a short-term outlook.)

## 💡 투자자 체크포인트
(1-2 key takeaways for personal investors.)

Tone: Professional, Insightful, and Crisp. Use Markdown.
"#,
        indices_text = indices_text,
        news_text = news_text,
    )
}

/// Pulls the 0-10 suitability score out of a generated analysis.
pub fn parse_quality_score(text: &str) -> Option<f64> {
    let patterns = [
        r"(?s)적합도 점수.*?(\d+(?:\.\d+)?)\s*/\s*10",
        r"(?i)score\s*[:：]\s*\**\s*(\d+(?:\.\d+)?)",
    ];

    patterns.iter().find_map(|pattern| {
        let re = Regex::new(pattern).ok()?;
        let score: f64 = re.captures(text)?.get(1)?.as_str().parse().ok()?;
        (0.0..=10.0).contains(&score).then_some(score)
    })
}

/// Narrative reports built from market data, retrieved news and the user profile.
#[derive(Clone)]
pub struct AiService {
    llm: LlmService,
    market: MarketDataService,
}

impl AiService {
    pub fn new(llm: LlmService, market: MarketDataService) -> Self {
        Self { llm, market }
    }

    /// False in demo mode, where reports are placeholder text not worth storing.
    pub fn is_enabled(&self) -> bool {
        self.llm.is_enabled()
    }

    pub async fn analyze_stock(
        &self,
        ticker: &str,
        data: &FullStockData,
        profile: &InvestorProfile,
    ) -> Result<String, LlmError> {
        let news = self.market.get_news(ticker, CONTEXT_NEWS_LIMIT).await;
        let context = news_chunks(&news);
        info!("Analyzing {} with {} context chunks", ticker, context.len());

        let prompt = build_stock_prompt(ticker, data, &context, profile);
        self.llm.generate_completion(prompt).await.map_err(|e| {
            error!("Error analyzing stock {}: {}", ticker, e);
            e
        })
    }

    pub async fn analyze_portfolio(
        &self,
        holdings: &[PortfolioItemResponse],
        profile: &InvestorProfile,
    ) -> Result<String, LlmError> {
        let prompt = build_portfolio_prompt(holdings, profile);
        self.llm.generate_completion(prompt).await.map_err(|e| {
            error!("Error analyzing portfolio: {}", e);
            e
        })
    }

    pub async fn generate_market_briefing(&self, data: &MarketBriefData) -> Result<String, LlmError> {
        let prompt = build_market_prompt(data);
        self.llm.generate_completion(prompt).await.map_err(|e| {
            error!("Error generating market briefing: {}", e);
            e
        })
    }
}
