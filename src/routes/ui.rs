use axum::{response::Html, routing::get, Router};

pub fn router() -> Router {
    Router::new().route("/", get(index))
}

async fn index() -> Html<&'static str> {
    Html(r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Data Agent - Ask your CSV</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 0; color: #1d1d1f; display: flex; min-height: 100vh; }
    aside { width: 300px; padding: 1.5rem; background: #f6f8fa; border-right: 1px solid #ddd; }
    main { flex: 1; padding: 1.5rem 2rem; display: flex; flex-direction: column; }
    h1 { margin-top: 0; }
    label { display: block; margin-top: 0.75rem; font-weight: 600; }
    input { width: 100%; padding: 0.5rem; box-sizing: border-box; }
    button { margin-top: 1rem; padding: 0.6rem 1rem; }
    .notice { margin-top: 0.75rem; padding: 0.6rem; border-radius: 6px; }
    .notice.success { background: #e6f4ea; color: #1e4620; }
    .notice.warning { background: #fff4e5; color: #663c00; }
    .notice.error { background: #fdecea; color: #611a15; }
    #transcript { flex: 1; overflow-y: auto; }
    .turn { margin: 0.75rem 0; padding: 0.75rem; border-radius: 8px; max-width: 80%; white-space: pre-wrap; }
    .turn.user { background: #e8f0fe; margin-left: auto; }
    .turn.assistant { background: #f1f3f4; }
    .turn img { max-width: 100%; }
    form.ask { display: flex; gap: 0.5rem; }
    form.ask input { flex: 1; }
    form.ask button { margin-top: 0; }
  </style>
</head>
<body>
  <aside>
    <h2>Configuration</h2>
    <label for="apiKey">API key</label>
    <input id="apiKey" type="password" autocomplete="off" />
    <label for="fileInput">CSV file</label>
    <input id="fileInput" type="file" accept=".csv,text/csv" />
    <button id="startBtn">Start agent</button>
    <div id="configNotice"></div>
    <pre id="datasetInfo"></pre>
    <button id="endBtn">End session</button>
  </aside>

  <main>
    <h1>Ask your CSV</h1>
    <p>Upload a CSV file and your API key, then ask questions about your data. Charts appear inline.</p>
    <div id="transcript"></div>
    <div id="chatNotice"></div>
    <form class="ask" id="askForm">
      <input id="question" placeholder="Ask a question about your data" autocomplete="off" />
      <button type="submit">Send</button>
    </form>
  </main>

  <script>
    const SESSION_KEY = 'data-agent-session';
    let sessionId = sessionStorage.getItem(SESSION_KEY);
    if (!sessionId) {
      sessionId = crypto.randomUUID();
      sessionStorage.setItem(SESSION_KEY, sessionId);
    }
    const headers = { 'x-session-id': sessionId };

    const transcript = document.getElementById('transcript');
    const configNotice = document.getElementById('configNotice');
    const chatNotice = document.getElementById('chatNotice');
    const datasetInfo = document.getElementById('datasetInfo');

    function showNotice(target, notice) {
      target.innerHTML = '';
      if (!notice) return;
      const div = document.createElement('div');
      div.className = 'notice ' + notice.level;
      div.textContent = notice.message;
      target.appendChild(div);
    }

    function renderTurn(turn) {
      const div = document.createElement('div');
      div.className = 'turn ' + turn.role;
      if (turn.kind === 'plot') {
        const img = document.createElement('img');
        img.src = 'data:image/png;base64,' + turn.content;
        div.appendChild(img);
      } else {
        div.textContent = turn.content;
      }
      transcript.appendChild(div);
    }

    function renderHistory(history) {
      transcript.innerHTML = '';
      history.forEach(renderTurn);
      transcript.scrollTop = transcript.scrollHeight;
    }

    function describeDataset(dataset) {
      if (!dataset) return '';
      const cols = dataset.columns.map(c => c.name + ' (' + c.column_type + ')').join('\n');
      return dataset.rows + ' rows\n' + cols;
    }

    async function loadHistory() {
      const res = await fetch('/api/history', { headers });
      if (res.ok) {
        const json = await res.json();
        renderHistory(json.history);
      }
    }

    document.getElementById('startBtn').addEventListener('click', async () => {
      const form = new FormData();
      form.append('api_key', document.getElementById('apiKey').value);
      const file = document.getElementById('fileInput').files[0];
      if (file) form.append('file', file);
      showNotice(configNotice, { level: 'success', message: 'Loading data and starting the agent...' });
      const res = await fetch('/api/agent', { method: 'POST', headers, body: form });
      const json = await res.json();
      showNotice(configNotice, json.notice);
      datasetInfo.textContent = describeDataset(json.dataset);
      if (res.ok) {
        renderHistory([]);
        showNotice(chatNotice, null);
      }
    });

    document.getElementById('askForm').addEventListener('submit', async (event) => {
      event.preventDefault();
      const input = document.getElementById('question');
      const question = input.value.trim();
      if (!question) return;
      input.value = '';
      showNotice(chatNotice, { level: 'success', message: 'Thinking...' });
      const res = await fetch('/api/chat', {
        method: 'POST',
        headers: { ...headers, 'Content-Type': 'application/json' },
        body: JSON.stringify({ question })
      });
      const json = await res.json();
      showNotice(chatNotice, json.notice);
      renderHistory(json.history);
    });

    document.getElementById('endBtn').addEventListener('click', async () => {
      await fetch('/api/session', { method: 'DELETE', headers });
      renderHistory([]);
      datasetInfo.textContent = '';
      showNotice(configNotice, null);
      showNotice(chatNotice, null);
    });

    loadHistory();
  </script>
</body>
</html>"#)
}
