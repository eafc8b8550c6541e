use serde_json::{json, Value};

use crate::models::{Choice, Poll};

/**
 * Pie chart configuration for the view page, one slice per choice in choice order
 */
pub fn chart_config(poll: &Poll) -> Value {
    let labels: Vec<&str> = poll.choices.iter().map(|c| c.choice.as_str()).collect();
    let data: Vec<Value> = poll
        .choices
        .iter()
        .map(|c| json!({ "value": c.count, "name": c.choice }))
        .collect();

    json!({
        "tooltip": {
            "trigger": "item",
            "formatter": "{b} : {c} ({d}%)",
        },
        "legend": {
            "x": "center",
            "y": "bottom",
            "data": labels,
        },
        "series": [{
            "type": "pie",
            "radius": "65%",
            "roseType": "angle",
            "data": data,
        }],
    })
}

/**
 * The choice with the most votes. Ties go to whichever was added first.
 */
pub fn most_voted(poll: &Poll) -> Option<&Choice> {
    poll.choices
        .iter()
        .fold(None, |best: Option<&Choice>, c| match best {
            Some(b) if b.count >= c.count => Some(b),
            _ => Some(c),
        })
}

pub fn total_votes(poll: &Poll) -> u64 {
    poll.choices.iter().map(|c| u64::from(c.count)).sum()
}
