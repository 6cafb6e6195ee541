//! Per-category extraction prompts.
//!
//! Every prompt carries the group roster as spelling hints and the transcript as
//! wrapped user data, and asks for a single JSON document in a fixed shape that
//! [`super::parse`] understands.

use crate::util::wrap_user_data;

/// Head portion kept when a transcript is truncated (introductions, roll call).
const TRANSCRIPT_HEAD_KEEP: usize = 3_000;

/// Characters reserved for the splice marker.
const SPLICE_MARKER_RESERVE: usize = 40;

/// Truncate transcript content with a tail-biased strategy.
///
/// Keeps the first few thousand characters (who is on the call) plus as much
/// of the end as fits in `max_chars`. Lengths are counted in characters, not
/// bytes.
pub fn truncate_transcript(content: &str, max_chars: usize) -> String {
    let total = content.chars().count();
    if total <= max_chars {
        return content.to_string();
    }

    let head_chars = TRANSCRIPT_HEAD_KEEP.min(max_chars / 4);
    let tail_chars = max_chars.saturating_sub(head_chars + SPLICE_MARKER_RESERVE);
    let head_end = char_offset(content, head_chars);
    let tail_start = char_offset(content, total - tail_chars);

    format!(
        "{}\n\n[... truncated {} chars ...]\n\n{}",
        &content[..head_end],
        total - head_chars - tail_chars,
        &content[tail_start..],
    )
}

/// Byte offset of the `n`th character.
fn char_offset(content: &str, n: usize) -> usize {
    content
        .char_indices()
        .nth(n)
        .map(|(i, _)| i)
        .unwrap_or(content.len())
}

fn roster_block(roster_names: &[String]) -> String {
    if roster_names.is_empty() {
        return "No member list is available for this group. Copy every name exactly as it is spoken.".to_string();
    }
    let list = roster_names
        .iter()
        .map(|n| format!("- {}", n))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Group members (prefer these spellings when a speaker is clearly one of them; \
otherwise copy the name exactly as it appears, and use null when you cannot tell who spoke):\n{}",
        wrap_user_data(&list)
    )
}

fn transcript_block(transcript: &str, max_chars: usize) -> String {
    wrap_user_data(&truncate_transcript(transcript, max_chars))
}

const PREAMBLE: &str = "You are an expert analyst of entrepreneur peer-group (mastermind) call transcripts.";

const JSON_ONLY: &str =
    "Respond with a single JSON document and nothing else. Do not invent people or facts that are not in the transcript.";

pub fn attendance_prompt(transcript: &str, roster_names: &[String], max_chars: usize) -> String {
    format!(
        r#"{preamble}

Determine who attended this call. Return one entry for every group member listed
below, plus any other speaker who is clearly a participant.

{roster}

Status must be one of:
- "present": spoke or was addressed as being on the call
- "absent without updates": not on the call and no reason given
- "travelling": away because of travel
- "family time": away for family reasons
- "work/business": away because of client or business commitments
- "wellness": away for health or rest

Shape:
{{"attendance": [{{"name": "<member name>", "status": "<status>", "notes": "<reason or remark, or null>"}}]}}

{json_only}

Transcript:
{transcript}
"#,
        preamble = PREAMBLE,
        roster = roster_block(roster_names),
        json_only = JSON_ONLY,
        transcript = transcript_block(transcript, max_chars),
    )
}

pub fn goals_prompt(transcript: &str, roster_names: &[String], max_chars: usize) -> String {
    format!(
        r#"{preamble}

Extract the accountability goal each participant committed to for the coming week.
Summarize each goal in about ten words. A goal is vague when a stranger could not
clearly say "yes, you did it" or "no, you didn't".

{roster}

Shape:
{{"goals": [{{"name": "<participant or null>", "quantifiable_goal": "<goal>", "is_vague": false}}]}}

{json_only}

Transcript:
{transcript}
"#,
        preamble = PREAMBLE,
        roster = roster_block(roster_names),
        json_only = JSON_ONLY,
        transcript = transcript_block(transcript, max_chars),
    )
}

pub fn challenges_prompt(transcript: &str, roster_names: &[String], max_chars: usize) -> String {
    format!(
        r#"{preamble}

Extract each participant's challenges and the strategies or tips offered for them.
A challenge can be explicit ("I'm stuck on lead generation") or implied; if implied,
state the real issue in one or two sentences. Strategies can come from anyone,
including the facilitator or the participant themselves. Ignore casual chatter.

Challenge categories: Clarity, Lead Generation, Sales & Conversion,
Systems & Operations, Time & Focus, Team & Delegation, Mindset / Emotional,
Scaling & Offers, Other. If none fit, propose one as "[NEW CATEGORY: <name>]".

Strategy tags:
- "Mindset Reframe"
- "A step by step action or method"
- "Resource or tool Suggestion"
- "Connection/referral"
- "A structure, model, or named methodology"

{roster}

The strategy "name" is the person who suggested it, or null if unclear.

Shape:
{{"challenges": [{{"name": "<participant>", "challenges": [{{"challenge": "<summary>", "category": "<category>", "strategies": [{{"name": "<suggested by or null>", "summary": "<short actionable summary>", "tag": "<tag>"}}]}}]}}]}}

{json_only}

Transcript:
{transcript}
"#,
        preamble = PREAMBLE,
        roster = roster_block(roster_names),
        json_only = JSON_ONLY,
        transcript = transcript_block(transcript, max_chars),
    )
}

pub fn marketing_prompt(transcript: &str, roster_names: &[String], max_chars: usize) -> String {
    format!(
        r#"{preamble}

Extract every marketing activity each participant reports.

Stage is one of "meetings" (booked or held), "proposals" (sent or planned),
"closed" (clients signed), or "none_mentioned".
Activity is one of "Network Activation", "linkedin", "cold_outreach", "none_mentioned".
Quantity is the number reported, 0 if none, negative when something was lost.
Contract type, when a contract was won, is "monthly", "one_time" or "hybrid".

{roster}

Shape:
{{"activities": [{{"name": "<participant or null>", "activities": [{{"stage": "<stage>", "activity": "<activity>", "quantity": 0, "outcome": {{"no_of_meetings": 0, "no_of_proposals": 0, "no_of_clients": 0, "notes": "<brief notes>"}}, "is_win": false, "contract_type": null, "revenue": null}}]}}]}}

{json_only}

Transcript:
{transcript}
"#,
        preamble = PREAMBLE,
        roster = roster_block(roster_names),
        json_only = JSON_ONLY,
        transcript = transcript_block(transcript, max_chars),
    )
}

pub fn stucks_prompt(transcript: &str, roster_names: &[String], max_chars: usize) -> String {
    format!(
        r#"{preamble}

Identify every participant who is stuck, stalled or not making progress. Look for
explicit statements ("I haven't done anything") and implied ones (the same goal
for weeks, "spinning wheels", "feeling off"). Quote them verbatim.

Classification is one of:
- "Momentum Drop": lost rhythm or progress temporarily
- "Emotional Block": frustration, shame, fear, perfectionism loops
- "Overwhelm": too many things, unclear priorities
- "Decision Paralysis": unsure which path to take
- "Repeating Goal": same goal for weeks without movement
- "Other"

{roster}

Shape:
{{"detections": [{{"name": "<participant>", "classification": "<classification>", "stuck_summary": "<what kind of stuckness and why>", "exact_quotes": ["<quote>"], "potential_next_step": "<one light-touch nudge>"}}]}}

{json_only}

Transcript:
{transcript}
"#,
        preamble = PREAMBLE,
        roster = roster_block(roster_names),
        json_only = JSON_ONLY,
        transcript = transcript_block(transcript, max_chars),
    )
}

pub fn sentiment_prompt(transcript: &str, roster_names: &[String], max_chars: usize) -> String {
    format!(
        r#"{preamble}

Rate the emotional tone of the whole call:
5 High Positive: multiple wins or breakthroughs, celebratory responses
4 Positive: general optimism, some wins, supportive energy
3 Neutral/Mixed: balanced tone, no strong spikes
2 Negative: several members stuck or low energy, venting without resolution
1 Very Negative: predominantly stuck, frustrated or demoralized

Also list representative statements, with who said them, the emotions they show
and whether they are negative. Confidence is between 0 and 1.

{roster}

Shape:
{{"sentiment_score": 3, "rationale": "<two or three sentences>", "dominant_emotion": "<emotion>", "confidence_score": 0.8, "representative_quotes": [{{"name": "<speaker>", "emotion": ["<emotion>"], "exact_quotes": ["<quote>"], "is_negative": false}}]}}

{json_only}

Transcript:
{transcript}
"#,
        preamble = PREAMBLE,
        roster = roster_block(roster_names),
        json_only = JSON_ONLY,
        transcript = transcript_block(transcript, max_chars),
    )
}
