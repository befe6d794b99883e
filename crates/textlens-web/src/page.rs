// The single-page UI. Buttons call the JSON endpoints in `server` and write
// the responses back into the matching fields.

pub const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>TextLens</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; }
  .row { display: flex; gap: 1rem; }
  .row > * { flex: 1; }
  label { display: block; font-weight: 600; margin: 1rem 0 0.25rem; }
  textarea, input[type=text] { width: 100%; box-sizing: border-box; font: inherit; }
  button { margin: 1rem 0.5rem 0 0; padding: 0.5rem 1rem; font: inherit; cursor: pointer; }
  button.primary { background: #f97316; color: #fff; border: none; }
  #download-link { display: none; margin-left: 0.5rem; }
</style>
</head>
<body>
<h1>&#128196; AI-Powered Text &amp; File Analyzer</h1>
<p>Upload a .txt file or enter text manually to get an AI-generated analysis and summary.</p>

<div class="row">
  <div>
    <label for="text-input">&#9997; Enter Text</label>
    <textarea id="text-input" rows="6" placeholder="Type or paste your text here..."></textarea>
  </div>
  <div>
    <label for="file-input">&#128194; Upload Text File (.txt)</label>
    <input id="file-input" type="file">
  </div>
</div>

<label for="output-text">&#128221; Analysis Result</label>
<textarea id="output-text" rows="10" readonly></textarea>

<label for="word-count">&#128202; Word Count</label>
<input id="word-count" type="text" readonly>

<div>
  <button id="analyze-button" class="primary">&#128269; Analyze</button>
  <button id="clear-button">&#128465; Clear</button>
</div>

<h3>&#128229; Download Analysis Result</h3>
<div>
  <button id="download-button">&#11015; Download Result</button>
  <a id="download-link" download>&#128196; Click to Download</a>
</div>

<script>
const $ = (id) => document.getElementById(id);

function showDownload(url) {
  const link = $("download-link");
  if (url) {
    link.href = url + "?t=" + Date.now();
    link.style.display = "inline";
  } else {
    link.removeAttribute("href");
    link.style.display = "none";
  }
}

$("analyze-button").addEventListener("click", async () => {
  const form = new FormData();
  form.append("text", $("text-input").value);
  const file = $("file-input").files[0];
  if (file) form.append("file", file, file.name);

  $("analyze-button").disabled = true;
  $("output-text").value = "Analyzing...";
  try {
    const res = await fetch("/api/analyze", { method: "POST", body: form });
    const out = await res.json();
    $("output-text").value = out.result;
    $("word-count").value = out.word_count;
  } catch (err) {
    $("output-text").value = "⚠ Error: " + err;
    $("word-count").value = "";
  } finally {
    $("analyze-button").disabled = false;
  }
});

$("clear-button").addEventListener("click", async () => {
  const res = await fetch("/api/clear", { method: "POST" });
  const out = await res.json();
  $("text-input").value = out.text;
  $("file-input").value = "";
  $("output-text").value = out.result;
  $("word-count").value = out.word_count;
  showDownload(out.download);
});

$("download-button").addEventListener("click", async () => {
  const res = await fetch("/api/export", {
    method: "POST",
    headers: { "content-type": "application/json" },
    body: JSON.stringify({ text: $("output-text").value }),
  });
  const out = await res.json();
  showDownload(out.download);
  if (out.error) alert(out.error);
});
</script>
</body>
</html>
"#;
