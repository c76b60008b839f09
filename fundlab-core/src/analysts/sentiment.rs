//! Sentiment analyzer — thresholds the news-sentiment score.

use super::Analyst;
use crate::domain::{AnalystId, MarketContext, Signal, SignalAction};

#[derive(Debug, Clone)]
pub struct SentimentAnalyzer {
    /// Absolute score below which sentiment reads as noise.
    pub threshold: f64,
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self { threshold: 0.25 }
    }
}

impl Analyst for SentimentAnalyzer {
    fn id(&self) -> AnalystId {
        AnalystId::new("sentiment-analyzer")
    }

    fn evaluate(&self, ctx: &MarketContext) -> Signal {
        let id = self.id();
        let score = match ctx.sentiment {
            Some(s) if s.is_finite() => s.clamp(-1.0, 1.0),
            _ => return Signal::hold(id, &ctx.symbol, "sentiment feed unavailable", ctx.as_of),
        };

        if score.abs() < self.threshold {
            return Signal::new(
                id,
                &ctx.symbol,
                SignalAction::Hold,
                0.2,
                format!("sentiment {:.2} within noise band", score),
                ctx.as_of,
            );
        }

        let action = if score > 0.0 { SignalAction::Buy } else { SignalAction::Sell };
        Signal::new(
            id,
            &ctx.symbol,
            action,
            score.abs().min(0.9),
            format!("news sentiment {:.2}", score),
            ctx.as_of,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysts::test_ctx::ctx_with_closes;

    #[test]
    fn strong_positive_sentiment_buys() {
        let mut ctx = ctx_with_closes("TSLA", vec![100.0; 5]);
        ctx.sentiment = Some(0.7);
        let s = SentimentAnalyzer::default().evaluate(&ctx);
        assert_eq!(s.action, SignalAction::Buy);
        assert!((s.confidence - 0.7).abs() < 1e-12);
    }

    #[test]
    fn strong_negative_sentiment_sells() {
        let mut ctx = ctx_with_closes("TSLA", vec![100.0; 5]);
        ctx.sentiment = Some(-0.6);
        let s = SentimentAnalyzer::default().evaluate(&ctx);
        assert_eq!(s.action, SignalAction::Sell);
    }

    #[test]
    fn weak_sentiment_holds() {
        let mut ctx = ctx_with_closes("TSLA", vec![100.0; 5]);
        ctx.sentiment = Some(0.1);
        let s = SentimentAnalyzer::default().evaluate(&ctx);
        assert_eq!(s.action, SignalAction::Hold);
    }

    #[test]
    fn missing_feed_downgrades() {
        let ctx = ctx_with_closes("TSLA", vec![100.0; 5]);
        let s = SentimentAnalyzer::default().evaluate(&ctx);
        assert_eq!(s.action, SignalAction::Hold);
        assert_eq!(s.confidence, 0.0);
    }
}
