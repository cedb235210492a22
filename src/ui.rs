use crate::models::CounterSnapshot;
use crate::stats::{format_compact, group_thousands, podium, rank};

pub fn render_index(
    mine: &CounterSnapshot,
    shared: &CounterSnapshot,
    total: u64,
    loading: bool,
) -> String {
    INDEX_HTML
        .replace("{{MY_TOTAL}}", &group_thousands(mine.total()))
        .replace("{{TOTAL}}", &group_thousands(total))
        .replace("{{PODIUM}}", &render_podium(shared))
        .replace("{{GRID}}", &render_grid(shared, loading))
}

fn render_podium(shared: &CounterSnapshot) -> String {
    podium(shared.clicks())
        .iter()
        .map(|entry| {
            format!(
                r#"<div class="place place-{rank}"><span class="code">{code}</span><span class="count">{count}</span><span class="rank">#{rank}</span></div>"#,
                rank = entry.rank,
                code = entry.country_code,
                count = format_compact(entry.count),
            )
        })
        .collect()
}

fn render_grid(shared: &CounterSnapshot, loading: bool) -> String {
    if shared.is_empty() {
        let message = if loading { "Loading counts..." } else { "No clicks yet." };
        return format!(r#"<p class="subtitle">{message}</p>"#);
    }

    rank(shared.clicks())
        .iter()
        .map(|entry| {
            format!(
                r#"<form method="post" action="/click"><input type="hidden" name="country_code" value="{code}" /><button class="flag" data-flag-code="{code}" type="submit"><span class="code">{code}</span><span class="count">{count}</span></button></form>"#,
                code = entry.country_code,
                count = format_compact(entry.count),
            )
        })
        .collect()
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>ClickFlag</title>
  <style>
    :root {
      --bg: #1e1f23;
      --ink: #f4f4f5;
      --muted: rgba(255, 255, 255, 0.6);
      --card: rgba(255, 255, 255, 0.06);
      --accent: #ffb347;
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Trebuchet MS", sans-serif;
      padding: 24px;
    }

    .counters {
      position: fixed;
      top: 16px;
      right: 16px;
      display: flex;
      gap: 8px;
    }

    .stat {
      background: var(--card);
      border-radius: 12px;
      padding: 10px 14px;
      display: grid;
      gap: 4px;
    }

    .stat .label {
      font-size: 0.75rem;
      text-transform: uppercase;
      letter-spacing: 0.1em;
      color: var(--muted);
    }

    .stat .value {
      font-size: 1.3rem;
      font-weight: 600;
    }

    .podium {
      display: flex;
      justify-content: center;
      align-items: flex-end;
      gap: 32px;
      margin: 64px 0 32px;
    }

    .place {
      display: grid;
      justify-items: center;
      gap: 4px;
    }

    .place-1 {
      order: 2;
      font-size: 1.6rem;
    }

    .place-2 {
      order: 1;
    }

    .place-3 {
      order: 3;
    }

    .place .rank {
      color: var(--muted);
      font-size: 0.8rem;
    }

    .grid {
      display: grid;
      grid-template-columns: repeat(auto-fill, minmax(72px, 1fr));
      gap: 16px;
    }

    .flag {
      appearance: none;
      width: 100%;
      border: none;
      border-radius: 10px;
      background: var(--card);
      color: var(--ink);
      padding: 12px 6px;
      display: grid;
      gap: 4px;
      cursor: pointer;
      transition: transform 150ms ease;
    }

    .flag:hover {
      transform: scale(1.05);
    }

    .flag .count {
      font-size: 0.75rem;
      color: var(--muted);
    }

    .custom {
      margin-top: 32px;
      display: flex;
      gap: 8px;
    }

    .subtitle {
      color: var(--muted);
    }
  </style>
</head>
<body>
  <h1 class="subtitle">ClickFlag: most clicked flags</h1>
  <div class="counters">
    <div class="stat">
      <span class="label">My Clicks</span>
      <span id="my-total" class="value">{{MY_TOTAL}}</span>
    </div>
    <div class="stat">
      <span class="label">Total Clicks</span>
      <span id="total" class="value">{{TOTAL}}</span>
    </div>
  </div>

  <section class="podium">{{PODIUM}}</section>
  <section class="grid">{{GRID}}</section>

  <form class="custom" method="post" action="/click">
    <input name="country_code" maxlength="16" placeholder="Country code" required />
    <button class="flag" type="submit">Click</button>
  </form>

  <script>
    const groupThousands = (num) => num.toString().replace(/\B(?=(\d{3})+(?!\d))/g, '.');

    const refresh = async () => {
      const res = await fetch('/api/counters');
      if (!res.ok) {
        return;
      }
      const data = await res.json();
      document.getElementById('my-total').textContent = groupThousands(data.my_total);
      document.getElementById('total').textContent = groupThousands(data.total);
    };

    setInterval(() => refresh().catch(() => {}), 1000);
  </script>
</body>
</html>
"#;
