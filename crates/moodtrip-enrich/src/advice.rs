//! Travel advice: model prompt with a deterministic rule-based fallback.

use moodtrip_core::{
    KeywordSet, NearbyFacility, NearbyIndex, QuestionAnswer, ScoredPlace, TimeOfDay, TravelAdvice,
    TravelQuestionnaire, WeatherSnapshot,
};
use moodtrip_infer::json::parse_json_object;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

static CLOCK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})[:：](\d{2})").expect("static regex"));

const HOT_DAY_CELSIUS: f64 = 30.0;
const WALKING_METERS: f64 = 500.0;
const TRANSIT_METERS: f64 = 5000.0;

/// Arrival time for a preference, moved earlier for rain and later on hot afternoons.
pub fn recommended_time(preference: TimeOfDay, weather: Option<&WeatherSnapshot>) -> &'static str {
    match weather {
        Some(w) if w.is_rainy() => "10:00",
        Some(w) if w.temperature.max > HOT_DAY_CELSIUS && preference == TimeOfDay::Afternoon => {
            "16:00"
        }
        _ => preference.default_arrival(),
    }
}

/// Transport modes by distance and party size.
pub fn recommended_transport(distance_meters: Option<f64>, travelers: u32) -> Vec<String> {
    let mut modes = Vec::new();
    match distance_meters {
        Some(d) if d < WALKING_METERS => modes.push("步行"),
        Some(d) if d < TRANSIT_METERS => {
            modes.push("公共交通");
            if travelers >= 3 {
                modes.push("打车");
            }
        }
        Some(_) => modes.extend(["自驾", "公共交通"]),
        None => modes.extend(["公共交通", "自驾"]),
    }
    modes.into_iter().map(String::from).collect()
}

pub fn fallback_advice(
    place: &ScoredPlace,
    questionnaire: &TravelQuestionnaire,
    weather: Option<&WeatherSnapshot>,
) -> TravelAdvice {
    let time = recommended_time(questionnaire.travel_time, weather);
    let notes = match weather {
        Some(w) => format!(
            "注意天气：{}，温度{}-{}°C",
            w.condition, w.temperature.min, w.temperature.max
        ),
        None => "请注意天气变化".to_string(),
    };
    TravelAdvice {
        recommended_time: time.to_string(),
        recommended_transport: recommended_transport(
            place.place.distance_meters,
            questionnaire.traveler_count,
        ),
        itinerary_suggestion: format!("建议在{}到达{}，游览时间约2-3小时。", time, place.place.name),
        notes,
    }
}

fn first_names(facilities: &[NearbyFacility]) -> String {
    facilities
        .iter()
        .take(3)
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join("、")
}

pub fn advice_prompt(
    place: &ScoredPlace,
    questionnaire: &TravelQuestionnaire,
    keywords: &KeywordSet,
    answers: &[QuestionAnswer],
    weather: Option<&WeatherSnapshot>,
    nearby: Option<&NearbyIndex>,
) -> String {
    let rating = place
        .place
        .rating
        .map(|r| r.to_string())
        .unwrap_or_else(|| "未知".into());
    let mut context = format!(
        "景点信息：\n- 名称：{}\n- 地址：{}\n- 评分：{}\n- 情绪关键词：{}\n\n出行信息：\n{}",
        place.place.name,
        place.place.address,
        rating,
        keywords.joined(),
        questionnaire.describe()
    );

    if !answers.is_empty() {
        context.push_str("\n\n用户补充：");
        for qa in answers {
            context.push_str(&format!("\n- {} {}", qa.question, qa.answer));
        }
    }

    if let Some(w) = weather {
        context.push_str(&format!(
            "\n\n天气信息：\n- 温度：{}°C - {}°C\n- 天气：{}\n- 降水量：{}mm\n- 风速：{}m/s",
            w.temperature.min, w.temperature.max, w.condition, w.precipitation, w.wind_speed
        ));
    }

    if let Some(n) = nearby {
        context.push_str("\n\n周边设施：");
        for (label, bucket) in [("交通", &n.transport), ("餐饮", &n.dining), ("住宿", &n.accommodation)] {
            if !bucket.is_empty() {
                context.push_str(&format!("\n- {}：{}", label, first_names(bucket)));
            }
        }
    }

    format!(
        "作为旅行规划专家，请根据以下信息为这个景点生成出行推荐：\n\n{}\n\n\
         请提供：\n\
         1. 最佳出行时间（具体到小时，考虑天气和人流量）\n\
         2. 推荐出行方式（自驾/公共交通/步行等，说明理由）\n\
         3. 行程安排建议（简要说明）\n\
         4. 注意事项（如天气、交通等）\n\n\
         请以JSON格式返回：{{\"recommendedTime\": \"HH:MM\", \"recommendedTransport\": [\"方式1\", \"方式2\"], \
         \"itinerarySuggestion\": \"建议内容\", \"notes\": \"注意事项\"}}",
        context
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdviceReply {
    #[serde(default)]
    recommended_time: Option<Value>,
    #[serde(default)]
    recommended_transport: Option<Value>,
    #[serde(default)]
    itinerary_suggestion: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

/// `HH:MM` from free text like "上午9:30左右".
fn normalize_time(raw: &str) -> Option<String> {
    let caps = CLOCK_TIME.captures(raw)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    (hour < 24 && minute < 60).then(|| format!("{:02}:{:02}", hour, minute))
}

fn transport_list(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(String::from)
            .collect(),
        Value::String(s) => s
            .split(|c| matches!(c, ',' | '，' | '、' | '/'))
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Merge a model reply over `fallback`; unusable fields keep the fallback value.
/// A reply with no JSON object at all is a `ParseFailure`.
pub fn parse_advice(reply: &str, fallback: TravelAdvice) -> moodtrip_core::Result<TravelAdvice> {
    let parsed: AdviceReply = parse_json_object(reply)?;
    let non_empty = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    Ok(TravelAdvice {
        recommended_time: parsed
            .recommended_time
            .as_ref()
            .and_then(|v| v.as_str())
            .and_then(normalize_time)
            .unwrap_or(fallback.recommended_time),
        recommended_transport: parsed
            .recommended_transport
            .as_ref()
            .map(transport_list)
            .filter(|t| !t.is_empty())
            .unwrap_or(fallback.recommended_transport),
        itinerary_suggestion: non_empty(parsed.itinerary_suggestion)
            .unwrap_or(fallback.itinerary_suggestion),
        notes: non_empty(parsed.notes).unwrap_or(fallback.notes),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use moodtrip_core::{CandidatePlace, GeoPoint, PlaceProvider, TemperatureRange};

    use super::*;

    fn scored(distance: Option<f64>) -> ScoredPlace {
        ScoredPlace {
            place: CandidatePlace {
                id: "1".into(),
                name: "静湖公园".into(),
                address: "湖滨路1号".into(),
                location: GeoPoint::new(30.0, 120.0),
                rating: Some(4.5),
                images: Vec::new(),
                description: String::new(),
                provider: PlaceProvider::Amap,
                distance_meters: distance,
            },
            score: 100.0,
            matched_keywords: Vec::new(),
        }
    }

    fn questionnaire(time: TimeOfDay, travelers: u32) -> TravelQuestionnaire {
        TravelQuestionnaire {
            travel_date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            travel_time: time,
            traveler_count: travelers,
            departure_location: "杭州".into(),
        }
    }

    fn weather(condition: &str, max: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            temperature: TemperatureRange { min: 20.0, max },
            condition: condition.into(),
            precipitation: 0.0,
            wind_speed: 2.0,
            humidity: 60.0,
        }
    }

    #[test]
    fn test_time_table_and_adjustments() {
        assert_eq!(recommended_time(TimeOfDay::Morning, None), "09:00");
        assert_eq!(recommended_time(TimeOfDay::Night, None), "20:00");
        assert_eq!(recommended_time(TimeOfDay::Evening, Some(&weather("中雨", 25.0))), "10:00");
        assert_eq!(recommended_time(TimeOfDay::Afternoon, Some(&weather("晴", 33.0))), "16:00");
        assert_eq!(recommended_time(TimeOfDay::Morning, Some(&weather("晴", 33.0))), "09:00");
        assert_eq!(recommended_time(TimeOfDay::Afternoon, Some(&weather("晴", 30.0))), "14:00");
    }

    #[test]
    fn test_transport_thresholds() {
        assert_eq!(recommended_transport(Some(499.0), 5), vec!["步行"]);
        assert_eq!(recommended_transport(Some(500.0), 2), vec!["公共交通"]);
        assert_eq!(recommended_transport(Some(4999.0), 3), vec!["公共交通", "打车"]);
        assert_eq!(recommended_transport(Some(5000.0), 1), vec!["自驾", "公共交通"]);
        assert_eq!(recommended_transport(None, 1), vec!["公共交通", "自驾"]);
    }

    #[test]
    fn test_fallback_text() {
        let advice = fallback_advice(
            &scored(Some(300.0)),
            &questionnaire(TimeOfDay::Afternoon, 2),
            Some(&weather("多云", 26.0)),
        );
        assert_eq!(advice.recommended_time, "14:00");
        assert_eq!(advice.recommended_transport, vec!["步行"]);
        assert_eq!(advice.itinerary_suggestion, "建议在14:00到达静湖公园，游览时间约2-3小时。");
        assert_eq!(advice.notes, "注意天气：多云，温度20-26°C");

        let advice = fallback_advice(&scored(None), &questionnaire(TimeOfDay::Morning, 1), None);
        assert_eq!(advice.notes, "请注意天气变化");
    }

    #[test]
    fn test_parse_advice_merges_fallback() {
        let fallback = fallback_advice(&scored(None), &questionnaire(TimeOfDay::Morning, 1), None);
        let advice = parse_advice(
            r#"推荐如下：{"recommendedTime": "上午9：30左右", "recommendedTransport": "地铁、步行", "itinerarySuggestion": "先环湖再喝茶", "notes": ""}"#,
            fallback.clone(),
        )
        .unwrap();
        assert_eq!(advice.recommended_time, "09:30");
        assert_eq!(advice.recommended_transport, vec!["地铁", "步行"]);
        assert_eq!(advice.itinerary_suggestion, "先环湖再喝茶");
        assert_eq!(advice.notes, fallback.notes);

        let vague = parse_advice(r#"{"recommendedTime": "傍晚"}"#, fallback.clone()).unwrap();
        assert_eq!(vague.recommended_time, "09:00");

        assert!(parse_advice("随便什么时候都行", fallback).is_err());
    }

    #[test]
    fn test_prompt_context() {
        let mut nearby = NearbyIndex::default();
        nearby.transport.push(NearbyFacility {
            name: "湖滨地铁站".into(),
            address: String::new(),
            distance_meters: Some(200.0),
            rating: None,
            location: GeoPoint::new(30.0, 120.0),
        });
        let answers = vec![QuestionAnswer {
            question: "喜欢热闹吗？".into(),
            answer: "不喜欢".into(),
        }];
        let prompt = advice_prompt(
            &scored(Some(300.0)),
            &questionnaire(TimeOfDay::Morning, 2),
            &["宁静"].into_iter().collect::<KeywordSet>(),
            &answers,
            Some(&weather("晴", 25.0)),
            Some(&nearby),
        );
        assert!(prompt.contains("静湖公园"));
        assert!(prompt.contains("- 交通：湖滨地铁站"));
        assert!(!prompt.contains("- 餐饮："));
        assert!(prompt.contains("不喜欢"));
        assert!(prompt.contains("天气：晴"));
    }
}
