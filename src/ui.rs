use crate::models::BoardView;

pub fn render_index(view: &BoardView) -> String {
    let board = serde_json::to_string(view)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/");
    INDEX_HTML
        .replace("{{TODAY}}", &view.today.format("%A, %B %-d, %Y").to_string())
        .replace("{{BOARD}}", &board)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Habit Tracker</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #eef4ea;
      --bg-2: #b9d8b0;
      --ink: #23302a;
      --accent: #4caf50;
      --danger: #e0574a;
      --muted: #6b7a70;
      --card: rgba(255, 255, 255, 0.88);
      --shadow: 0 24px 60px rgba(35, 48, 42, 0.16);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #f6faf3 70%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: start center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(760px, 100%);
      background: var(--card);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 32px;
      display: grid;
      gap: 24px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(2rem, 4vw, 2.6rem);
      margin: 0;
    }

    .subtitle,
    small {
      color: var(--muted);
    }

    form.add {
      display: flex;
      flex-wrap: wrap;
      gap: 10px;
    }

    input {
      flex: 1;
      min-width: 120px;
      padding: 10px 12px;
      border-radius: 12px;
      border: 1px solid rgba(35, 48, 42, 0.2);
      font: inherit;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 10px 18px;
      font: inherit;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent);
      color: white;
    }

    button.delete {
      background: var(--danger);
      padding: 4px 12px;
      font-size: 0.85rem;
    }

    button.ghost {
      background: transparent;
      color: var(--ink);
      border: 1px solid rgba(35, 48, 42, 0.2);
      padding: 4px 12px;
      font-size: 0.85rem;
    }

    .habit {
      background: white;
      border-radius: 18px;
      padding: 16px 18px;
      border: 1px solid rgba(35, 48, 42, 0.08);
      display: grid;
      gap: 8px;
    }

    .habit.met {
      border-color: var(--accent);
    }

    .habit header {
      display: flex;
      align-items: center;
      gap: 10px;
    }

    .habit header strong {
      flex: 1;
    }

    .value-row {
      display: flex;
      align-items: center;
      gap: 10px;
    }

    .value-row input {
      flex: 0 0 90px;
      font-size: 1.3rem;
    }

    .history {
      border-top: 1px dashed rgba(35, 48, 42, 0.2);
      padding-top: 8px;
      display: grid;
      gap: 4px;
    }

    .history .total {
      font-weight: 600;
    }

    .status {
      min-height: 1.2em;
      font-size: 0.9rem;
    }

    .status.error {
      color: var(--danger);
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Habit Tracker</h1>
      <p class="subtitle">Today: {{TODAY}}</p>
    </header>

    <form class="add" id="add-form">
      <input id="habit-name" placeholder="Habit name" />
      <input id="habit-category" placeholder="Category" />
      <input id="habit-goal" type="number" placeholder="Goal (optional)" />
      <button type="submit">Add Habit</button>
    </form>

    <div class="status" id="status"></div>
    <section id="habits"></section>
  </main>

  <script>
    let board = {{BOARD}};

    const habitsEl = document.getElementById('habits');
    const statusEl = document.getElementById('status');
    const nameInput = document.getElementById('habit-name');
    const categoryInput = document.getElementById('habit-category');
    const goalInput = document.getElementById('habit-goal');

    const setStatus = (message, tone) => {
      statusEl.textContent = message;
      statusEl.className = `status ${tone || ''}`;
    };

    const request = async (method, url, body) => {
      const res = await fetch(url, {
        method,
        headers: body ? { 'content-type': 'application/json' } : {},
        body: body ? JSON.stringify(body) : undefined
      });
      if (!res.ok) {
        const msg = await res.text();
        throw new Error(msg || 'Request failed');
      }
      return res.json();
    };

    const el = (tag, props, children) => {
      const node = Object.assign(document.createElement(tag), props || {});
      (children || []).forEach((child) => node.append(child));
      return node;
    };

    const renderHistory = () => {
      if (board.expanded === null) {
        return null;
      }
      const rows = board.history.map((log) => el('small', { textContent: `${log.log_date}: ${log.value}` }));
      return el('div', { className: 'history' }, [
        ...rows,
        el('span', { className: 'total', textContent: `Week total: ${board.week_total}` })
      ]);
    };

    const render = () => {
      nameInput.value = board.draft.name;
      categoryInput.value = board.draft.category;
      goalInput.value = board.draft.goal;
      if (board.notice) {
        setStatus(board.notice.message, 'error');
      }

      habitsEl.replaceChildren(...board.habits.map((habit) => {
        const input = el('input', { type: 'number', value: habit.value });
        input.addEventListener('change', () => {
          request('PUT', `/api/habits/${habit.id}/value`, { value: input.value })
            .then((row) => {
              habit.value = row.value;
              render();
            })
            .catch((err) => setStatus(err.message, 'error'));
        });

        const remove = el('button', { className: 'delete', type: 'button', textContent: 'Delete' });
        remove.addEventListener('click', () => {
          if (!confirm('Are you sure you want to delete this habit?')) {
            return;
          }
          request('DELETE', `/api/habits/${habit.id}?confirmed=true`)
            .then((next) => {
              board = next;
              render();
            })
            .catch((err) => setStatus(err.message, 'error'));
        });

        const toggle = el('button', {
          className: 'ghost',
          type: 'button',
          textContent: board.expanded === habit.id ? 'Hide history' : 'History'
        });
        toggle.addEventListener('click', () => {
          request('POST', `/api/habits/${habit.id}/history`)
            .then((history) => {
              Object.assign(board, history);
              render();
            })
            .catch((err) => setStatus(err.message, 'error'));
        });

        const met = habit.goal !== null && habit.value >= habit.goal;
        const children = [
          el('header', {}, [el('strong', { textContent: habit.name }), toggle, remove]),
          el('div', { className: 'value-row' }, [
            input,
            habit.goal !== null ? el('small', { textContent: `/ ${habit.goal}` }) : ''
          ]),
          el('small', { textContent: habit.category })
        ];
        if (board.expanded === habit.id) {
          children.push(renderHistory());
        }
        return el('div', { className: `habit ${met ? 'met' : ''}` }, children);
      }));
    };

    document.getElementById('add-form').addEventListener('submit', (event) => {
      event.preventDefault();
      const form = {
        name: nameInput.value,
        category: categoryInput.value,
        goal: goalInput.value
      };
      if (!form.name.trim()) {
        alert('Please enter a habit name');
        return;
      }
      request('POST', '/api/habits', form)
        .then((next) => {
          board = next;
          setStatus('', '');
          render();
        })
        .catch((err) => {
          alert('Failed to add habit');
          setStatus(err.message, 'error');
        });
    });

    render();
  </script>
</body>
</html>
"#;
